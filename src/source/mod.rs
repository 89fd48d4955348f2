//! Source content provider - research reports and their preprocessing

mod document;
mod preprocess;

pub use document::{SourceDocument, find_markdown_report};
pub use preprocess::{DEFAULT_MAX_CHARS, preprocess_markdown};
