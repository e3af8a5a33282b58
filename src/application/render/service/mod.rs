mod block;
mod escape;
mod html;
mod inline;
mod placeholder;
mod protect;
mod sanitize;
mod strip;
mod styles;

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::application::render::types::{RenderOutput, RenderService};

use block::{Block, parse_blocks};
use html::render_blocks;
use placeholder::{PlaceholderRegistry, strip_reserved};
use protect::{protect_fenced_code, protect_inline_code};
use sanitize::build_markup_sanitizer;

pub use strip::{plain_text_length, strip_markup};

/// Markdown renderer producing the inline-styled HTML dialect stored with
/// posts and answers.
///
/// Each call owns its own [`PlaceholderRegistry`]; the service itself holds
/// only the immutable sanitiser, so one instance is shared across threads.
pub struct MarkdownRenderService {
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownRenderService {
    pub fn new() -> Self {
        Self {
            sanitizer: build_markup_sanitizer(),
        }
    }
}

impl Default for MarkdownRenderService {
    fn default() -> Self {
        Self::new()
    }
}

static RENDER_SERVICE: Lazy<Arc<MarkdownRenderService>> =
    Lazy::new(|| Arc::new(MarkdownRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<MarkdownRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

/// Render markdown to HTML with the shared service.
pub fn render_markdown(markdown: &str) -> String {
    render_service().render(markdown).html
}

impl RenderService for MarkdownRenderService {
    fn render(&self, markdown: &str) -> RenderOutput {
        let source = normalize_stage(markdown);
        let mut registry = PlaceholderRegistry::new();

        let protected = protect_stage(&source, &mut registry);
        let blocks = parse_blocks(&protected, &registry);
        let contains_table = blocks
            .iter()
            .any(|block| matches!(block, Block::Table { .. }));
        let rendered = render_blocks(&blocks, &self.sanitizer);

        let contains_code = !registry.is_empty();
        let html = restore_stage(rendered, registry);

        RenderOutput {
            html,
            contains_code,
            contains_table,
        }
    }
}

fn normalize_stage(markdown: &str) -> String {
    strip_reserved(markdown).replace("\r\n", "\n").replace('\r', "\n")
}

fn protect_stage(source: &str, registry: &mut PlaceholderRegistry) -> String {
    let fenced = protect_fenced_code(source, registry);
    protect_inline_code(&fenced, registry)
}

fn restore_stage(html: String, registry: PlaceholderRegistry) -> String {
    let resolved = registry.resolve(&html);
    if resolved.unconsumed > 0 {
        warn!(
            target = "application::render::restore_stage",
            unconsumed = resolved.unconsumed,
            "Placeholder fragments were not referenced by the rendered document"
        );
    }
    resolved.html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        MarkdownRenderService::new().render(markdown).html
    }

    #[test]
    fn plain_paragraph() {
        assert_eq!(
            render("hello world"),
            format!("<p style=\"{}\">hello world</p>", styles::PARAGRAPH)
        );
    }

    #[test]
    fn paragraph_lines_become_breaks() {
        assert_eq!(
            render("line one\r\nline two"),
            format!("<p style=\"{}\">line one<br>line two</p>", styles::PARAGRAPH)
        );
    }

    #[test]
    fn whitespace_only_input_renders_nothing() {
        assert_eq!(render("  \n\n\t\n"), "");
    }

    #[test]
    fn fenced_code_is_not_wrapped_in_paragraph() {
        let html = render("```\n# not a heading\n```");
        assert_eq!(
            html,
            format!(
                "<pre style=\"{}\"><code># not a heading</code></pre>",
                styles::CODE_BLOCK
            )
        );
    }

    #[test]
    fn inline_code_at_paragraph_start_is_wrapped() {
        let html = render("`x` marks the spot");
        assert!(html.starts_with("<p "));
        assert!(html.contains("<code "));
    }

    #[test]
    fn inline_code_survives_inside_link_labels() {
        let html = render("[`cfg`](/docs)");
        assert!(html.contains(">cfg</code></a>"));
    }

    #[test]
    fn heading_and_list() {
        let html = render("## Steps\n1. first\n2. **second**");
        assert_eq!(
            html,
            format!(
                "<h2 style=\"{h2}\">Steps</h2>\n<ol style=\"{list}\"><li style=\"{item}\">first</li><li style=\"{item}\"><strong>second</strong></li></ol>",
                h2 = styles::heading(2),
                list = styles::LIST,
                item = styles::LIST_ITEM,
            )
        );
    }

    #[test]
    fn reports_code_and_table_flags() {
        let service = MarkdownRenderService::new();
        let output = service.render("| a | b |\n| - | - |\n| `1` | 2 |");
        assert!(output.contains_code);
        assert!(output.contains_table);

        let output = service.render("no code here");
        assert!(!output.contains_code);
        assert!(!output.contains_table);
    }

    #[test]
    fn shared_service_matches_fresh_instance() {
        let markdown = "> quoted *text*\n>\n> more";
        assert_eq!(render_markdown(markdown), render(markdown));
    }
}
