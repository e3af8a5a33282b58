//! Inline styles attached to every generated element.
//!
//! Rendered HTML is stored and embedded as-is (notification mails, feeds,
//! third-party embeds), so presentation travels with the markup instead of a
//! stylesheet.

use std::collections::HashSet;

use once_cell::sync::Lazy;

pub(crate) const PARAGRAPH: &str = "margin:0 0 12px;line-height:1.6;";
pub(crate) const BLOCKQUOTE: &str =
    "margin:0 0 12px;padding:4px 12px;border-left:4px solid #d0d7de;color:#57606a;";
pub(crate) const LIST: &str = "margin:0 0 12px;padding-left:24px;";
pub(crate) const LIST_ITEM: &str = "margin:4px 0;";
pub(crate) const RULE: &str = "border:none;border-top:1px solid #d0d7de;margin:16px 0;";
pub(crate) const TABLE: &str = "border-collapse:collapse;margin:0 0 12px;";
pub(crate) const CODE_BLOCK: &str = "margin:0 0 12px;padding:12px;background:#f6f8fa;border-radius:6px;overflow-x:auto;font-family:monospace;font-size:0.9em;";
pub(crate) const INLINE_CODE: &str =
    "padding:2px 4px;background:#f6f8fa;border-radius:4px;font-family:monospace;font-size:0.9em;";
pub(crate) const LINK: &str = "color:#0969da;text-decoration:underline;";

const HEADINGS: [&str; 6] = [
    "margin:20px 0 10px;font-size:1.6em;font-weight:600;",
    "margin:18px 0 10px;font-size:1.4em;font-weight:600;",
    "margin:16px 0 8px;font-size:1.25em;font-weight:600;",
    "margin:14px 0 8px;font-size:1.1em;font-weight:600;",
    "margin:12px 0 6px;font-size:1em;font-weight:600;",
    "margin:12px 0 6px;font-size:0.9em;font-weight:600;color:#57606a;",
];

const HEADER_CELL: &str = "border:1px solid #d0d7de;padding:6px 12px;background:#f6f8fa;font-weight:600;";
const BODY_CELL: &str = "border:1px solid #d0d7de;padding:6px 12px;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    const ALL: [Alignment; 4] = [
        Alignment::None,
        Alignment::Left,
        Alignment::Center,
        Alignment::Right,
    ];

    fn declaration(self) -> &'static str {
        match self {
            Alignment::None => "",
            Alignment::Left => "text-align:left;",
            Alignment::Center => "text-align:center;",
            Alignment::Right => "text-align:right;",
        }
    }
}

/// `level` is clamped to 1..=6.
pub(crate) fn heading(level: u8) -> &'static str {
    let index = usize::from(level.clamp(1, 6)) - 1;
    HEADINGS[index]
}

pub(crate) fn cell(header: bool, alignment: Alignment) -> String {
    let base = if header { HEADER_CELL } else { BODY_CELL };
    format!("{base}{}", alignment.declaration())
}

static GENERATED: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut styles: HashSet<String> = [
        PARAGRAPH,
        BLOCKQUOTE,
        LIST,
        LIST_ITEM,
        RULE,
        TABLE,
        CODE_BLOCK,
        INLINE_CODE,
        LINK,
    ]
    .into_iter()
    .chain(HEADINGS)
    .map(str::to_string)
    .collect();

    for alignment in Alignment::ALL {
        styles.insert(cell(true, alignment));
        styles.insert(cell(false, alignment));
    }
    styles
});

/// True when `value` is a style this renderer emits itself.
pub(crate) fn is_generated(value: &str) -> bool {
    GENERATED.contains(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_styles_cover_cells_and_headings() {
        assert!(is_generated(PARAGRAPH));
        assert!(is_generated(heading(3)));
        assert!(is_generated(&cell(false, Alignment::Right)));
        assert!(!is_generated("position:fixed;top:0;"));
    }

    #[test]
    fn heading_level_is_clamped() {
        assert_eq!(heading(0), heading(1));
        assert_eq!(heading(9), heading(6));
    }
}
