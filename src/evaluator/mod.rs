//! Model-based quality evaluation
//!
//! - `Rubric`: weighted 1-5 dimensions, hard-fail vetoes, threshold
//! - `QualityEvaluator`: the scoring seam the loop depends on
//! - `LlmEvaluator`: scores through a text-generation client
//! - `ScriptedEvaluator`: queued verdicts for tests

mod judge;
mod rubric;
mod score;
mod scripted;

pub use judge::{EvalError, LlmEvaluator, QualityEvaluator};
pub use rubric::{Dimension, HardFailRule, Rubric};
pub use score::{QualityScore, parse_score};
pub use scripted::ScriptedEvaluator;
