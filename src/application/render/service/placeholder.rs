//! Per-render placeholder arena.
//!
//! Protected fragments are swapped for tokens of the form `U+E000 <index> U+E001`.
//! Both delimiters are private-use code points that are stripped from the
//! input before any protection pass runs, so a token can never appear in
//! user text.

use std::borrow::Cow;

pub(crate) const TOKEN_OPEN: char = '\u{E000}';
pub(crate) const TOKEN_CLOSE: char = '\u{E001}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentKind {
    /// Occupies a whole line and is never wrapped in a paragraph.
    Block,
    /// Lives inside running text.
    Inline,
}

#[derive(Debug)]
struct Entry {
    kind: FragmentKind,
    fragment: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct PlaceholderRegistry {
    entries: Vec<Entry>,
}

pub(crate) struct Resolved {
    pub(crate) html: String,
    pub(crate) unconsumed: usize,
}

impl PlaceholderRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Store a finished fragment and return the token standing in for it.
    pub(crate) fn insert(&mut self, kind: FragmentKind, fragment: String) -> String {
        let index = self.entries.len();
        self.entries.push(Entry {
            kind,
            fragment: Some(fragment),
        });
        token(index)
    }

    /// True when `candidate` is exactly one block token issued by this registry.
    pub(crate) fn is_block_token(&self, candidate: &str) -> bool {
        let Some(inner) = candidate
            .strip_prefix(TOKEN_OPEN)
            .and_then(|rest| rest.strip_suffix(TOKEN_CLOSE))
        else {
            return false;
        };
        inner
            .parse::<usize>()
            .ok()
            .and_then(|index| self.entries.get(index))
            .is_some_and(|entry| entry.kind == FragmentKind::Block)
    }

    /// Substitute every token in a single pass. Each fragment is handed out at
    /// most once; the count of fragments never claimed is reported back.
    pub(crate) fn resolve(mut self, html: &str) -> Resolved {
        let mut output = String::with_capacity(html.len());
        let mut rest = html;

        while let Some(start) = rest.find(TOKEN_OPEN) {
            output.push_str(&rest[..start]);
            let after = &rest[start + TOKEN_OPEN.len_utf8()..];
            match parse_token(after) {
                Some((index, consumed)) => {
                    if let Some(fragment) = self
                        .entries
                        .get_mut(index)
                        .and_then(|entry| entry.fragment.take())
                    {
                        output.push_str(&fragment);
                    }
                    rest = &after[consumed..];
                }
                None => rest = after,
            }
        }
        output.push_str(rest);

        let unconsumed = self
            .entries
            .iter()
            .filter(|entry| entry.fragment.is_some())
            .count();

        Resolved {
            html: output,
            unconsumed,
        }
    }
}

fn token(index: usize) -> String {
    format!("{TOKEN_OPEN}{index}{TOKEN_CLOSE}")
}

fn parse_token(after_open: &str) -> Option<(usize, usize)> {
    let digits = after_open
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_open.len());
    if digits == 0 || !after_open[digits..].starts_with(TOKEN_CLOSE) {
        return None;
    }
    let index = after_open[..digits].parse().ok()?;
    Some((index, digits + TOKEN_CLOSE.len_utf8()))
}

/// Remove the reserved delimiters from untrusted input.
pub(crate) fn strip_reserved(input: &str) -> Cow<'_, str> {
    if input.contains([TOKEN_OPEN, TOKEN_CLOSE]) {
        Cow::Owned(
            input
                .chars()
                .filter(|c| *c != TOKEN_OPEN && *c != TOKEN_CLOSE)
                .collect(),
        )
    } else {
        Cow::Borrowed(input)
    }
}

/// True when the text still carries a token delimiter.
pub(crate) fn contains_token(text: &str) -> bool {
    text.contains([TOKEN_OPEN, TOKEN_CLOSE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_resolved_once() {
        let mut registry = PlaceholderRegistry::new();
        let first = registry.insert(FragmentKind::Inline, "<b>one</b>".to_string());
        let second = registry.insert(FragmentKind::Block, "<b>two</b>".to_string());
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);

        let resolved = registry.resolve(&format!("a {first} b {second} c {first}"));
        assert_eq!(resolved.html, "a <b>one</b> b <b>two</b> c ");
        assert_eq!(resolved.unconsumed, 0);
    }

    #[test]
    fn unclaimed_fragments_are_counted() {
        let mut registry = PlaceholderRegistry::new();
        registry.insert(FragmentKind::Inline, "x".to_string());
        let resolved = registry.resolve("nothing here");
        assert_eq!(resolved.html, "nothing here");
        assert_eq!(resolved.unconsumed, 1);
    }

    #[test]
    fn block_token_detection_checks_kind() {
        let mut registry = PlaceholderRegistry::new();
        let inline = registry.insert(FragmentKind::Inline, String::new());
        let block = registry.insert(FragmentKind::Block, String::new());
        assert!(registry.is_block_token(&block));
        assert!(!registry.is_block_token(&inline));
        assert!(!registry.is_block_token(&format!("{block} tail")));
    }

    #[test]
    fn reserved_delimiters_are_stripped() {
        let input = format!("a{TOKEN_OPEN}0{TOKEN_CLOSE}b");
        assert_eq!(strip_reserved(&input), "a0b");
        assert!(matches!(strip_reserved("plain"), Cow::Borrowed("plain")));
    }
}
