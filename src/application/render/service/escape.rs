/// Escape code and attribute values: `& < > " '`.
pub(crate) fn escape_html(value: &str) -> String {
    html_escape::encode_quoted_attribute(value).into_owned()
}

/// Escape a text node. Quotes are left alone and U+00A0 is written as
/// `&nbsp;`, matching how the sanitiser serialises text, so already-rendered
/// text reads back byte-for-byte after a sanitiser round trip.
pub(crate) fn escape_text(value: &str) -> String {
    let escaped = html_escape::encode_text(value);
    if escaped.contains('\u{a0}') {
        escaped.replace('\u{a0}', "&nbsp;")
    } else {
        escaped.into_owned()
    }
}
