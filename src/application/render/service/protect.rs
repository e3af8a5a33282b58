//! Code protection passes. Both run before any structural parsing so code
//! content is escaped once and never seen by later stages.

use super::escape::escape_html;
use super::placeholder::{FragmentKind, PlaceholderRegistry};
use super::styles;

/// Replace closed ```` ``` ```` fences with block tokens. An unclosed fence is
/// left as ordinary text.
pub(crate) fn protect_fenced_code(text: &str, registry: &mut PlaceholderRegistry) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0;

    while index < lines.len() {
        if let Some(language) = fence_open(lines[index]) {
            let close = (index + 1..lines.len()).find(|&candidate| is_fence_close(lines[candidate]));
            if let Some(close) = close {
                let body = lines[index + 1..close].join("\n");
                let token = registry.insert(FragmentKind::Block, code_block_html(language, &body));
                output.push(token);
                index = close + 1;
                continue;
            }
        }
        output.push(lines[index].to_string());
        index += 1;
    }

    output.join("\n")
}

/// Replace single-backtick spans with inline tokens. Spans never cross a line
/// break and must not be empty.
pub(crate) fn protect_inline_code(text: &str, registry: &mut PlaceholderRegistry) -> String {
    let mut output = String::with_capacity(text.len());

    for (position, line) in text.split('\n').enumerate() {
        if position > 0 {
            output.push('\n');
        }

        let mut rest = line;
        while let Some(open) = rest.find('`') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('`') {
                Some(0) => {
                    output.push_str("``");
                    rest = &after[1..];
                }
                Some(close) => {
                    let fragment = inline_code_html(&after[..close]);
                    output.push_str(&registry.insert(FragmentKind::Inline, fragment));
                    rest = &after[close + 1..];
                }
                None => {
                    output.push('`');
                    rest = after;
                    break;
                }
            }
        }
        output.push_str(rest);
    }

    output
}

fn fence_open(line: &str) -> Option<&str> {
    let info = line.trim_start().strip_prefix("```")?;
    if info.contains('`') {
        return None;
    }
    Some(info.split_whitespace().next().unwrap_or(""))
}

fn is_fence_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

fn code_block_html(language: &str, body: &str) -> String {
    let language: String = language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect();
    let class = if language.is_empty() {
        String::new()
    } else {
        format!(" class=\"language-{}\"", escape_html(&language))
    };
    format!(
        "<pre style=\"{}\"><code{class}>{}</code></pre>",
        styles::CODE_BLOCK,
        escape_html(body)
    )
}

fn inline_code_html(content: &str) -> String {
    format!(
        "<code style=\"{}\">{}</code>",
        styles::INLINE_CODE,
        escape_html(content)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_becomes_single_token_line() {
        let mut registry = PlaceholderRegistry::new();
        let text = "before\n```rust\nlet x = 1;\n```\nafter";
        let protected = protect_fenced_code(text, &mut registry);

        let lines: Vec<&str> = protected.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "before");
        assert!(registry.is_block_token(lines[1]));
        assert_eq!(lines[2], "after");

        let resolved = registry.resolve(lines[1]);
        assert!(resolved.html.contains("class=\"language-rust\""));
        assert!(resolved.html.contains("let x = 1;"));
    }

    #[test]
    fn unclosed_fence_is_left_alone() {
        let mut registry = PlaceholderRegistry::new();
        let text = "```\nno closing fence";
        assert_eq!(protect_fenced_code(text, &mut registry), text);
        assert!(registry.is_empty());
    }

    #[test]
    fn inline_spans_are_escaped_and_tokenised() {
        let mut registry = PlaceholderRegistry::new();
        let protected = protect_inline_code("use `a<b>` and `c`", &mut registry);
        assert_eq!(registry.len(), 2);
        assert!(!protected.contains('`'));

        let resolved = registry.resolve(&protected);
        assert!(resolved.html.contains("a&lt;b&gt;</code>"));
        assert_eq!(resolved.unconsumed, 0);
    }

    #[test]
    fn empty_and_unmatched_backticks_stay_literal() {
        let mut registry = PlaceholderRegistry::new();
        let protected = protect_inline_code("`` and `dangling", &mut registry);
        assert_eq!(protected, "`` and `dangling");
        assert!(registry.is_empty());
    }

    #[test]
    fn spans_do_not_cross_lines() {
        let mut registry = PlaceholderRegistry::new();
        let protected = protect_inline_code("`open\nclose`", &mut registry);
        assert_eq!(protected, "`open\nclose`");
    }
}
