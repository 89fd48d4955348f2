//! Automatic, deterministic checks run against every candidate before the
//! model-based evaluator is consulted.

mod battery;
mod fabrication;
pub mod feedback;
mod forbidden;
mod length;
mod structure;
mod traits;

pub use battery::CheckBattery;
pub use fabrication::FabricationCheck;
pub use feedback::{FailureCategory, FailureDetail, FeedbackFormatter, RoundFeedback, RoundStage};
pub use forbidden::ForbiddenTermCheck;
pub use length::LengthCheck;
pub use structure::StructureCheck;
pub use traits::{Check, CheckResult, Severity};
