use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;

use super::styles;

/// Sanitiser for pre-rendered markup chunks. Only the elements and attributes
/// the renderer emits survive; `style` must match a generated style exactly.
pub(crate) fn build_markup_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "li",
        "ol",
        "p",
        "pre",
        "strong",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);
    builder.generic_attributes(HashSet::from(["style"]));
    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));

    builder.attribute_filter(|element, attribute, value| match attribute {
        "style" => styles::is_generated(value).then_some(Cow::Borrowed(value)),
        "class" if element == "code" => value
            .strip_prefix("language-")
            .filter(|language| {
                !language.is_empty()
                    && language
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
            })
            .map(|_| Cow::Borrowed(value)),
        "target" => (value == "_blank").then_some(Cow::Borrowed(value)),
        _ => Some(Cow::Borrowed(value)),
    });

    builder
}
