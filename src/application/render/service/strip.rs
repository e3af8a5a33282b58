//! Markup stripping used for prompt input and answer length checks.

use lol_html::{RewriteStrSettings, doc_comments, element, html_content::ContentType, rewrite_str};

use crate::application::render::types::RenderError;

/// Elements whose boundaries separate words once tags are gone.
const BREAKING_ELEMENTS: &[&str] = &[
    "blockquote", "br", "div", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "p", "pre", "td",
    "th", "tr",
];

/// Remove every tag, drop `script`/`style` bodies and comments, decode
/// entities and collapse whitespace.
pub fn strip_markup(html: &str) -> Result<String, RenderError> {
    let text = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name();
                if matches!(tag.as_str(), "script" | "style") {
                    el.remove();
                    return Ok(());
                }
                if BREAKING_ELEMENTS.contains(&tag.as_str()) {
                    el.before(" ", ContentType::Text);
                    if el.can_have_content() {
                        el.after(" ", ContentType::Text);
                    }
                }
                el.remove_and_keep_content();
                Ok(())
            })],
            document_content_handlers: vec![doc_comments!(|comment| {
                comment.remove();
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let decoded = html_escape::decode_html_entities(&text);
    Ok(collapse_whitespace(&decoded))
}

/// Character count of the visible text of `html`.
pub fn plain_text_length(html: &str) -> Result<usize, RenderError> {
    strip_markup(html).map(|text| text.chars().count())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
