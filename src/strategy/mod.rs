//! Generation strategies
//!
//! Each strategy turns a `ContentRequest` into a `Candidate`. The loop only
//! talks to a `StrategyChain`, which tries them in order.

mod chain;
mod single_pass;
mod template;
mod traits;
mod two_stage;

pub use chain::StrategyChain;
pub use single_pass::{SinglePassStrategy, revision_preamble};
pub use template::{RankedParagraph, TemplateStrategy, rank_paragraphs};
pub use traits::{GenerationError, GenerationStrategy};
pub use two_stage::{ContentAngle, TwoStageStrategy};
