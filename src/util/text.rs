use std::borrow::Cow;

/// Removes HTML tags from a string, keeping only the text between them.
///
/// Quoted attribute values are honoured, so a `>` inside `title="a > b"`
/// does not end the tag early. HTML comments are dropped entirely.
/// Entities are left untouched.
///
/// Returns `Cow::Borrowed` when the input contains no `<` (common case for
/// titles).
///
/// # Examples
///
/// ```
/// use feedpress::util::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
/// assert_eq!(strip_tags("plain text"), "plain text");
/// ```
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        if let Some(comment) = tail.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        // Scan to the closing '>' outside of quotes
        let mut quote: Option<char> = None;
        let mut end = None;
        for (idx, c) in tail.char_indices().skip(1) {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '>') => {
                    end = Some(idx);
                    break;
                }
                _ => {}
            }
        }

        rest = match end {
            Some(idx) => &tail[idx + 1..],
            // Unterminated tag swallows the remainder, like strip_tags does
            None => "",
        };
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Escapes the five HTML-significant characters so text can be embedded in
/// element content or a quoted attribute value.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Reduces an HTML body to an allowlist of formatting markup.
///
/// Runs the input through `ammonia`: unknown elements are unwrapped,
/// `<script>`, `<style>` and `<iframe>` are dropped with their contents,
/// every `on*` attribute is removed and only safe URL schemes survive in
/// `href`/`src`. Links get `rel="noopener noreferrer"`.
pub fn sanitize_html(s: &str) -> String {
    ammonia::Builder::default()
        .add_clean_content_tags(["iframe"])
        .clean(s)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_plain_text_is_borrowed() {
        let result = strip_tags("Beginner Guide to Baking");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Beginner Guide to Baking");
    }

    #[test]
    fn test_strip_tags_nested_markup() {
        assert_eq!(
            strip_tags("<div><p>Fast <a href=\"/x\">tips</a></p></div>"),
            "Fast tips"
        );
    }

    #[test]
    fn test_strip_tags_quoted_gt_in_attribute() {
        assert_eq!(strip_tags("<img alt=\"a > b\" src='x.png'>after"), "after");
    }

    #[test]
    fn test_strip_tags_drops_comments() {
        assert_eq!(strip_tags("a<!-- hidden guide -->b"), "ab");
    }

    #[test]
    fn test_strip_tags_unterminated_tag() {
        assert_eq!(strip_tags("text <broken"), "text ");
    }

    #[test]
    fn test_strip_tags_keeps_unicode() {
        assert_eq!(strip_tags("<em>日本語</em> ガイド"), "日本語 ガイド");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"Fish & "Chips" <b>'n'</b>"#),
            "Fish &amp; &quot;Chips&quot; &lt;b&gt;&#039;n&#039;&lt;/b&gt;"
        );
        assert!(matches!(escape_html("safe"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_removes_script_and_style() {
        let input = "<p>ok</p><script>alert(1)</script><STYLE>p{}</STYLE><p>done</p>";
        assert_eq!(sanitize_html(input), "<p>ok</p><p>done</p>");
    }

    #[test]
    fn test_sanitize_removes_iframe_with_contents() {
        let input = "<iframe src=\"https://evil.example.com\">inner</iframe>after";
        assert_eq!(sanitize_html(input), "after");
    }

    #[test]
    fn test_sanitize_split_script_tag_does_not_reassemble() {
        let out = sanitize_html("<scr<script>x</script>ipt>alert(1)</script>");
        assert!(!out.to_lowercase().contains("<script"), "got {out}");
        assert!(!out.contains("<scr"), "got {out}");
    }

    #[test]
    fn test_sanitize_removes_slash_separated_event_handler() {
        let out = sanitize_html("<img/onerror=alert(1) src=x>");
        assert!(!out.contains("onerror"), "got {out}");
        assert!(out.contains("<img"));
    }

    #[test]
    fn test_sanitize_removes_quoted_event_handlers() {
        let out = sanitize_html(r#"<p onclick="steal()">Hi</p> the onion=good"#);
        assert_eq!(out, "<p>Hi</p> the onion=good");
    }

    #[test]
    fn test_sanitize_drops_javascript_links() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">click</a>"#);
        assert!(!out.contains("javascript"), "got {out}");
        assert!(out.contains(">click</a>"));
    }

    #[test]
    fn test_sanitize_keeps_formatting_and_links() {
        let out = sanitize_html(
            r#"<p><strong>Fast</strong> <a href="https://example.com/x">tips</a></p>"#,
        );
        assert!(out.starts_with("<p><strong>Fast</strong> <a href=\"https://example.com/x\""));
        assert!(out.ends_with(">tips</a></p>"));
    }
}
