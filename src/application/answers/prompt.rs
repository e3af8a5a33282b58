use crate::{
    application::render::{RenderError, strip_markup},
    domain::entities::ContentItem,
};

use super::config::AnswerConfig;

/// System and user prompt for one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPrompt {
    pub system: String,
    pub user: String,
}

/// Build the prompt for `item`, reducing title and body to bounded plain text.
pub fn build_prompt(item: &ContentItem, config: &AnswerConfig) -> Result<AnswerPrompt, RenderError> {
    let title = bounded(&strip_markup(&item.title)?, config.max_source_chars);
    let body = bounded(&strip_markup(&item.body)?, config.max_source_chars);

    let system = format!(
        "You are a helpful community member answering questions on a discussion board. \
         Always reply in {language}, regardless of the language of the question. \
         Match the length of your reply to the question: answer simple questions in a \
         sentence or two, and use short paragraphs, lists or code blocks only when the \
         question is complex enough to need them. \
         Write plain markdown. Do not use raw HTML. \
         Keep the whole reply under {limit} characters.",
        language = config.language,
        limit = config.max_comment_length,
    );

    let user = if body.is_empty() {
        format!("Question title: {title}")
    } else {
        format!("Question title: {title}\n\nQuestion details:\n{body}")
    };

    Ok(AnswerPrompt { system, user })
}

fn bounded(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}
