//! Line lexer and block parser.
//!
//! Precedence is fixed by the order in which [`parse_blocks`] tries each
//! construct: protected code, tables, pre-rendered markup, headings, rules,
//! quotes, lists, and finally paragraphs.

use super::placeholder::PlaceholderRegistry;
use super::styles::Alignment;

/// Block tags that mark a chunk as already-rendered markup.
const MARKUP_BLOCK_TAGS: &[&str] = &[
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "ol",
    "p",
    "pre",
    "table",
    "ul",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block<'a> {
    /// A line holding exactly one block placeholder token.
    Protected(&'a str),
    /// Consecutive lines starting with an allowlisted block tag.
    Markup(Vec<&'a str>),
    Heading {
        level: u8,
        text: &'a str,
    },
    Rule,
    Quote(Vec<&'a str>),
    List {
        ordered: bool,
        start: u64,
        items: Vec<&'a str>,
    },
    Table {
        alignments: Vec<Alignment>,
        header: Vec<&'a str>,
        rows: Vec<Vec<&'a str>>,
    },
    Paragraph(Vec<&'a str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Protected(&'a str),
    Markup(&'a str),
    Heading { level: u8, text: &'a str },
    Rule,
    Quote(&'a str),
    Unordered(&'a str),
    Ordered { number: u64, text: &'a str },
    Text(&'a str),
}

pub(crate) fn parse_blocks<'a>(text: &'a str, registry: &PlaceholderRegistry) -> Vec<Block<'a>> {
    let lines: Vec<&'a str> = text.split('\n').collect();
    let mut blocks = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        if let Some((table, next)) = parse_table(&lines, index, registry) {
            blocks.push(table);
            index = next;
            continue;
        }

        match classify(lines[index], registry) {
            Line::Blank => index += 1,
            Line::Protected(token) => {
                blocks.push(Block::Protected(token));
                index += 1;
            }
            Line::Markup(first) => {
                let mut chunk = vec![first];
                index += 1;
                // Structural lines end the chunk and are parsed on their own.
                while let Some(line) = lines.get(index).copied() {
                    if parse_table(&lines, index, registry).is_some() {
                        break;
                    }
                    match classify(line, registry) {
                        Line::Markup(next) | Line::Text(next) => {
                            chunk.push(next);
                            index += 1;
                        }
                        _ => break,
                    }
                }
                blocks.push(Block::Markup(chunk));
            }
            Line::Heading { level, text } => {
                blocks.push(Block::Heading { level, text });
                index += 1;
            }
            Line::Rule => {
                blocks.push(Block::Rule);
                index += 1;
            }
            Line::Quote(first) => {
                let mut quoted = vec![first];
                index += 1;
                while let Some(Line::Quote(next)) =
                    lines.get(index).copied().map(|line| classify(line, registry))
                {
                    quoted.push(next);
                    index += 1;
                }
                blocks.push(Block::Quote(quoted));
            }
            Line::Unordered(first) => {
                let mut items = vec![first];
                index += 1;
                while let Some(Line::Unordered(next)) =
                    lines.get(index).copied().map(|line| classify(line, registry))
                {
                    items.push(next);
                    index += 1;
                }
                blocks.push(Block::List {
                    ordered: false,
                    start: 1,
                    items,
                });
            }
            Line::Ordered { number, text } => {
                let mut items = vec![text];
                index += 1;
                while let Some(Line::Ordered { text: next, .. }) =
                    lines.get(index).copied().map(|line| classify(line, registry))
                {
                    items.push(next);
                    index += 1;
                }
                blocks.push(Block::List {
                    ordered: true,
                    start: number,
                    items,
                });
            }
            Line::Text(first) => {
                let mut paragraph = vec![first];
                index += 1;
                while index < lines.len() && parse_table(&lines, index, registry).is_none() {
                    match classify(lines[index], registry) {
                        Line::Text(next) => {
                            paragraph.push(next);
                            index += 1;
                        }
                        _ => break,
                    }
                }
                blocks.push(Block::Paragraph(paragraph));
            }
        }
    }

    blocks
}

fn classify<'a>(line: &'a str, registry: &PlaceholderRegistry) -> Line<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if registry.is_block_token(trimmed) {
        return Line::Protected(trimmed);
    }
    if starts_with_markup_tag(trimmed) {
        return Line::Markup(trimmed);
    }
    if let Some((level, text)) = heading(trimmed) {
        return Line::Heading { level, text };
    }
    if is_rule(trimmed) {
        return Line::Rule;
    }
    if let Some(rest) = trimmed.strip_prefix('>') {
        return Line::Quote(rest.strip_prefix(' ').unwrap_or(rest).trim_end());
    }
    if let Some(text) = unordered_item(trimmed) {
        return Line::Unordered(text);
    }
    if let Some((number, text)) = ordered_item(trimmed) {
        return Line::Ordered { number, text };
    }
    Line::Text(trimmed)
}

fn starts_with_markup_tag(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('<') else {
        return false;
    };
    let name_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let name = rest[..name_len].to_ascii_lowercase();
    if !MARKUP_BLOCK_TAGS.contains(&name.as_str()) {
        return false;
    }
    matches!(
        rest[name_len..].chars().next(),
        Some('>' | '/' | ' ' | '\t')
    )
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.len() < text.len()
        && (without_closing.is_empty() || without_closing.ends_with([' ', '\t']))
    {
        without_closing.trim_end()
    } else {
        text
    };
    if text.is_empty() {
        return None;
    }
    let level = u8::try_from(hashes).ok()?;
    Some((level, text))
}

fn is_rule(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && line.len() >= 3 && chars.all(|c| c == first)
}

fn unordered_item(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(['-', '*'])?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim_start();
    (!text.is_empty()).then_some(text)
}

fn ordered_item(line: &str) -> Option<(u64, &str)> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim_start();
    if text.is_empty() {
        return None;
    }
    let number = line[..digits].parse().ok()?;
    Some((number, text))
}

fn parse_table<'a>(
    lines: &[&'a str],
    index: usize,
    registry: &PlaceholderRegistry,
) -> Option<(Block<'a>, usize)> {
    let header_line = lines.get(index)?.trim();
    if !header_line.contains('|') || registry.is_block_token(header_line) {
        return None;
    }
    let alignments = parse_separator(lines.get(index + 1)?.trim())?;
    let header = split_row(header_line);
    if header.len() != alignments.len() {
        return None;
    }

    let mut rows = Vec::new();
    let mut next = index + 2;
    while let Some(line) = lines.get(next) {
        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.contains('|') || registry.is_block_token(trimmed) {
            break;
        }
        let mut cells = split_row(trimmed);
        cells.resize(header.len(), "");
        rows.push(cells);
        next += 1;
    }

    Some((
        Block::Table {
            alignments,
            header,
            rows,
        },
        next,
    ))
}

fn parse_separator(line: &str) -> Option<Vec<Alignment>> {
    if !line.contains('|') {
        return None;
    }
    split_row(line)
        .into_iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':') && cell.len() > 1;
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

fn split_row(line: &str) -> Vec<&str> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}
