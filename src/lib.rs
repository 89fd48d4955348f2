//! Postforge - turns equity-research reports into platform-ready posts
//!
//! Every post comes out of a bounded generate-evaluate-revise loop: a
//! strategy chain drafts a candidate, deterministic checks and a model-based
//! evaluator judge it, and rejected drafts are revised with the collected
//! feedback until one is accepted or the round budget runs out.

pub mod checks;
pub mod config;
pub mod content;
pub mod error;
pub mod evaluator;
pub mod id;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod runner;
pub mod source;
pub mod strategy;

pub use error::{PostforgeError, Result};
