use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Finished HTML with every placeholder resolved.
    pub html: String,
    /// Indicates whether the input carried fenced or inline code.
    pub contains_code: bool,
    /// Indicates whether a table was produced.
    pub contains_table: bool,
}

/// Structured errors surfaced while post-processing rendered HTML. Rendering
/// itself never fails on input shape.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs.
pub trait RenderService: Send + Sync {
    fn render(&self, markdown: &str) -> RenderOutput;
}
