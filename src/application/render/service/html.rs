//! Block renderer: walks parsed blocks and emits styled HTML. Placeholder
//! tokens pass through untouched and are resolved afterwards.

use ammonia::Builder as AmmoniaBuilder;

use super::block::Block;
use super::inline::render_inline;
use super::styles::{self, Alignment};

pub(crate) fn render_blocks(blocks: &[Block<'_>], sanitizer: &AmmoniaBuilder<'static>) -> String {
    blocks
        .iter()
        .filter_map(|block| render_block(block, sanitizer))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &Block<'_>, sanitizer: &AmmoniaBuilder<'static>) -> Option<String> {
    let mut html = String::new();
    match block {
        Block::Protected(token) => html.push_str(token),
        Block::Markup(lines) => {
            let cleaned = sanitizer.clean(&lines.join("\n")).to_string();
            if cleaned.trim().is_empty() {
                return None;
            }
            html.push_str(&cleaned);
        }
        Block::Heading { level, text } => {
            html.push_str(&format!("<h{level} style=\"{}\">", styles::heading(*level)));
            render_inline(text, &mut html);
            html.push_str(&format!("</h{level}>"));
        }
        Block::Rule => html.push_str(&format!("<hr style=\"{}\">", styles::RULE)),
        Block::Quote(lines) => {
            html.push_str(&format!("<blockquote style=\"{}\">", styles::BLOCKQUOTE));
            push_lines(lines, &mut html);
            html.push_str("</blockquote>");
        }
        Block::List {
            ordered,
            start,
            items,
        } => {
            let tag = if *ordered { "ol" } else { "ul" };
            if *ordered && *start != 1 {
                html.push_str(&format!("<ol start=\"{start}\" style=\"{}\">", styles::LIST));
            } else {
                html.push_str(&format!("<{tag} style=\"{}\">", styles::LIST));
            }
            for item in items {
                html.push_str(&format!("<li style=\"{}\">", styles::LIST_ITEM));
                render_inline(item, &mut html);
                html.push_str("</li>");
            }
            html.push_str(&format!("</{tag}>"));
        }
        Block::Table {
            alignments,
            header,
            rows,
        } => render_table(alignments, header, rows, &mut html),
        Block::Paragraph(lines) => {
            html.push_str(&format!("<p style=\"{}\">", styles::PARAGRAPH));
            push_lines(lines, &mut html);
            html.push_str("</p>");
        }
    }
    Some(html)
}

fn push_lines(lines: &[&str], html: &mut String) {
    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            html.push_str("<br>");
        }
        render_inline(line, html);
    }
}

fn render_table(alignments: &[Alignment], header: &[&str], rows: &[Vec<&str>], html: &mut String) {
    html.push_str(&format!("<table style=\"{}\"><thead><tr>", styles::TABLE));
    for (index, cell) in header.iter().enumerate() {
        push_cell("th", cell, alignment_at(alignments, index), html);
    }
    html.push_str("</tr></thead>");

    if !rows.is_empty() {
        html.push_str("<tbody>");
        for row in rows {
            html.push_str("<tr>");
            for (index, cell) in row.iter().enumerate() {
                push_cell("td", cell, alignment_at(alignments, index), html);
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody>");
    }
    html.push_str("</table>");
}

fn push_cell(tag: &str, text: &str, alignment: Alignment, html: &mut String) {
    let style = styles::cell(tag == "th", alignment);
    html.push_str(&format!("<{tag} style=\"{style}\">"));
    render_inline(text, html);
    html.push_str(&format!("</{tag}>"));
}

fn alignment_at(alignments: &[Alignment], index: usize) -> Alignment {
    alignments.get(index).copied().unwrap_or(Alignment::None)
}
