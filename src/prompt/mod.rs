//! Prompt System - Template loading and typed rendering
//!
//! Templates reference a closed set of placeholders (`PromptField`). Rendering
//! uses Handlebars in strict mode and refuses to run with unbound fields.

pub mod builtin;
mod fields;
mod loader;
mod render;

pub use fields::{PromptBindings, PromptField};
pub use loader::PromptLoader;
pub use render::{PromptRenderer, PromptTemplate};
