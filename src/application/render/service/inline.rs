//! Inline grammar: links, strong and emphasis over a single line of text.

use url::Url;

use super::escape::{escape_html, escape_text};
use super::placeholder::contains_token;
use super::styles;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Inline<'a> {
    Text(&'a str),
    Strong(Vec<Inline<'a>>),
    Emphasis(Vec<Inline<'a>>),
    Link {
        label: Vec<Inline<'a>>,
        href: &'a str,
    },
}

pub(crate) fn parse_inline(text: &str) -> Vec<Inline<'_>> {
    parse(text, true)
}

/// Render one line of inline text into `output`.
pub(crate) fn render_inline(text: &str, output: &mut String) {
    for node in parse_inline(text) {
        write_node(&node, output);
    }
}

fn parse(text: &str, allow_links: bool) -> Vec<Inline<'_>> {
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let rest = &text[cursor..];
        let matched = if rest.starts_with("**") {
            strong_span(text, cursor).map(|(close, next)| {
                (
                    Inline::Strong(parse(&text[cursor + 2..close], allow_links)),
                    next,
                )
            })
        } else if rest.starts_with('*') {
            emphasis_span(text, cursor).map(|(close, next)| {
                (
                    Inline::Emphasis(parse(&text[cursor + 1..close], allow_links)),
                    next,
                )
            })
        } else if allow_links && rest.starts_with('[') {
            link_span(text, cursor).map(|(label, href, next)| {
                (
                    Inline::Link {
                        label: parse(label, false),
                        href,
                    },
                    next,
                )
            })
        } else {
            None
        };

        match matched {
            Some((node, next)) => {
                if text_start < cursor {
                    nodes.push(Inline::Text(&text[text_start..cursor]));
                }
                nodes.push(node);
                cursor = next;
                text_start = next;
            }
            None => cursor += rest.chars().next().map_or(1, char::len_utf8),
        }
    }

    if text_start < text.len() {
        nodes.push(Inline::Text(&text[text_start..]));
    }
    nodes
}

/// Returns `(close, next)` for a `**` opener at `open`. When the closer is part
/// of a longer star run, the last two stars close so `***x***` nests.
fn strong_span(text: &str, open: usize) -> Option<(usize, usize)> {
    let inner_start = open + 2;
    let mut cursor = inner_start;

    while cursor < text.len() {
        let rest = &text[cursor..];
        if rest.starts_with("**") {
            let run = star_run(rest);
            let close = cursor + run - 2;
            if is_delimited(&text[inner_start..close]) {
                return Some((close, close + 2));
            }
            cursor += run;
            continue;
        }
        cursor += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Returns `(close, next)` for a single `*` opener. Double-star runs inside the
/// span belong to nested strong text and are skipped.
fn emphasis_span(text: &str, open: usize) -> Option<(usize, usize)> {
    let inner_start = open + 1;
    let mut cursor = inner_start;

    while cursor < text.len() {
        let rest = &text[cursor..];
        if rest.starts_with("**") {
            cursor += star_run(rest);
            continue;
        }
        if rest.starts_with('*') && is_delimited(&text[inner_start..cursor]) {
            return Some((cursor, cursor + 1));
        }
        cursor += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn link_span(text: &str, open: usize) -> Option<(&str, &str, usize)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut cursor = open;
    let label_end = loop {
        match bytes.get(cursor)? {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break cursor;
                }
            }
            _ => {}
        }
        cursor += 1;
    };

    let label = &text[open + 1..label_end];
    if label.trim().is_empty() {
        return None;
    }

    let target = text[label_end + 1..].strip_prefix('(')?;
    let close = closing_paren(target)?;
    let href = target[..close].trim();
    if href.is_empty()
        || href.contains(char::is_whitespace)
        || contains_token(href)
        || !is_allowed_href(href)
    {
        return None;
    }

    Some((label, href, label_end + 2 + close + 1))
}

/// Index of the `)` that balances the already-consumed `(`.
fn closing_paren(target: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in target.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' if depth == 0 => return Some(index),
            b')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Absolute links must use http, https or mailto; relative links pass.
pub(crate) fn is_allowed_href(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn star_run(text: &str) -> usize {
    text.bytes().take_while(|byte| *byte == b'*').count()
}

fn is_delimited(inner: &str) -> bool {
    !inner.is_empty()
        && !inner.starts_with(char::is_whitespace)
        && !inner.ends_with(char::is_whitespace)
}

fn write_node(node: &Inline<'_>, output: &mut String) {
    match node {
        Inline::Text(text) => output.push_str(&escape_text(text)),
        Inline::Strong(children) => {
            output.push_str("<strong>");
            children.iter().for_each(|child| write_node(child, output));
            output.push_str("</strong>");
        }
        Inline::Emphasis(children) => {
            output.push_str("<em>");
            children.iter().for_each(|child| write_node(child, output));
            output.push_str("</em>");
        }
        Inline::Link { label, href } => {
            output.push_str("<a href=\"");
            output.push_str(&escape_html(href));
            output.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\" style=\"");
            output.push_str(styles::LINK);
            output.push_str("\">");
            label.iter().for_each(|child| write_node(child, output));
            output.push_str("</a>");
        }
    }
}
