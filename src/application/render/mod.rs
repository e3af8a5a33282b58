//! Rendering service.
//!
//! The pipeline is pure: it accepts markdown input and produces deterministic
//! HTML. Code is protected first, the remaining text is parsed into blocks and
//! inline nodes, and protected fragments are restored last.

mod service;
mod types;

pub use service::{
    MarkdownRenderService, plain_text_length, render_markdown, render_service, strip_markup,
};
pub use types::{RenderError, RenderOutput, RenderService};
