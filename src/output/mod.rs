//! Output persistence for accepted posts and failure reports

mod writer;

pub use writer::{ArtifactWriter, HEADER_END, render_artifact};
