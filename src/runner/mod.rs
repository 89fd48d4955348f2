//! Loop runner module - the generate-evaluate-revise loop.
//!
//! This module provides:
//! - `ContentLoop` for running one request through bounded rounds
//! - `Orchestrator` for running independent requests concurrently
//! - Cooperative abort via `AbortSignal`

mod abort;
mod loop_runner;
mod orchestrator;
mod state;

pub use abort::{AbortFlag, AbortSignal, NeverAbort};
pub use loop_runner::{ContentLoop, LoopConfig};
pub use orchestrator::Orchestrator;
pub use state::LoopState;
