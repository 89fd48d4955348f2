//! Content model: platforms, requests, candidates, loop outcomes and
//! post-generation cleanup.

mod candidate;
pub mod filter;
mod outcome;
mod platform;
mod request;

pub use candidate::{Candidate, Payload, flatten};
pub use filter::{clean_generated_content, clean_structured};
pub use outcome::{BestEffort, FailureKind, FailureReport, FinalArtifact, LoopOutcome};
pub use platform::Platform;
pub use request::{ContentRequest, ContentRequestBuilder, LengthRange, LengthUnit, StructuralRules, UnitRule};
