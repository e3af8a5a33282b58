use piazza::application::render::{
    MarkdownRenderService, RenderService, plain_text_length, render_markdown, strip_markup,
};

fn render(markdown: &str) -> String {
    MarkdownRenderService::new().render(markdown).html
}

#[test]
fn plain_text_output_renders_to_itself() {
    for input in [
        "hello world",
        "Fish & chips < 3 > 2",
        "two\nlines",
        "**bold** and *soft*",
        "a\u{a0}b",
    ] {
        let once = render(input);
        assert_eq!(render(&once), once, "not stable for {input:?}");
    }
}

#[test]
fn fenced_code_content_is_opaque() {
    let html = render("Intro\n\n```rust\n# not a heading\nlet s = `tick` **no**;\n```\n\nOutro");

    assert!(html.contains("<code class=\"language-rust\"># not a heading\nlet s = `tick` **no**;</code>"));
    assert!(!html.contains("<h1"));
    assert!(!html.contains("<strong>no</strong>"));
    assert!(html.starts_with("<p "));
    assert!(html.ends_with("Outro</p>"));
}

#[test]
fn inline_code_is_escaped_and_literal() {
    let html = render("run `<b>*x*</b>` now");
    assert!(html.contains("&lt;b&gt;*x*&lt;/b&gt;</code>"));
    assert!(!html.contains("<em>"));
}

#[test]
fn placeholder_tokens_never_leak() {
    let inputs = [
        "```\nfence\n```",
        "a `b` c `d` e",
        "stray \u{E000}0\u{E001} token",
        "| `x` | y |\n| --- | --- |\n| `1` | 2 |",
        "```\nunclosed",
        "> quoted `code`\n- item `one`",
    ];
    for input in inputs {
        let html = render(input);
        assert!(
            !html.contains('\u{E000}') && !html.contains('\u{E001}'),
            "token leaked for {input:?}: {html}"
        );
    }
}

#[test]
fn table_with_header_and_two_rows() {
    let output = MarkdownRenderService::new().render("| a | b |\n| --- | :---: |\n| 1 | 2 |\n| 3 | 4 |");

    assert!(output.contains_table);
    assert_eq!(output.html.matches("<th ").count(), 2);
    assert_eq!(output.html.matches("<td ").count(), 4);
    assert_eq!(output.html.matches("<tr>").count(), 3);
    assert!(output.html.contains("</thead><tbody><tr>"));
    assert!(output.html.ends_with("</tbody></table>"));
}

#[test]
fn table_without_separator_is_a_paragraph() {
    let output = MarkdownRenderService::new().render("| a | b |\n| 1 | 2 |");

    assert!(!output.contains_table);
    assert!(!output.html.contains("<table"));
    assert!(output.html.starts_with("<p "));
    assert!(output.html.contains("| a | b |<br>| 1 | 2 |"));
}

#[test]
fn script_text_is_escaped() {
    let html = render_markdown("<script>alert(1)</script>");
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script"));
}

#[test]
fn unsafe_link_targets_stay_literal() {
    let html = render_markdown("[click](javascript:alert(1))");
    assert!(!html.contains("<a "));
    assert!(!html.contains("href=\"javascript"));
    assert!(html.contains("[click](javascript:alert(1))"));
}

#[test]
fn markup_chunks_lose_foreign_attributes() {
    let html = render_markdown("<p onclick=\"steal()\" style=\"color: red\">hi</p>");
    assert!(html.contains("hi"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("color: red"));
}

#[test]
fn structure_after_a_markup_line_is_still_parsed() {
    let html = render_markdown("<p>intro</p>\n# Heading\n- a\n- b");
    assert!(html.starts_with("<p>intro</p>\n<h1 "));
    assert!(html.contains(">Heading</h1>"));
    assert_eq!(html.matches("<li ").count(), 2);
    assert!(!html.contains("# Heading"));
    assert!(!html.contains("- a"));
}

#[test]
fn link_targets_keep_balanced_parentheses() {
    let html = render_markdown("[wiki](https://en.wikipedia.org/wiki/Rust_(language))");
    assert!(html.contains("href=\"https://en.wikipedia.org/wiki/Rust_(language)\""));
    assert!(html.contains(">wiki</a></p>"));
}

#[test]
fn extra_row_cells_are_dropped() {
    let html = render_markdown("| a | b |\n| --- | --- |\n| 1 | 2 | 3 |");
    assert_eq!(html.matches("<td ").count(), 2);
    assert!(!html.contains(">3</td>"));
}

#[test]
fn stripped_text_matches_visible_content() {
    let html = render_markdown("# Title\n\nSome **bold** text & more");
    let text = strip_markup(&html).unwrap();
    assert!(text.contains("Title"));
    assert!(text.contains("Some bold text & more"));
    assert_eq!(plain_text_length(&html).unwrap(), text.chars().count());
}
