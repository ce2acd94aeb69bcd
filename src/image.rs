//! Featured-image discovery for feed items.

use crate::feed::FeedItem;
use regex::Regex;
use std::sync::OnceLock;

fn inline_img_src() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*['"]([^'"]+)['"]"#)
            .expect("img src pattern is valid")
    })
}

/// Picks the best image URL for `item`.
///
/// Order is fixed:
/// 1. an enclosure whose MIME type contains `image`
/// 2. the `src` of the first `<img>` tag in the raw content
///    (single or double quoted)
/// 3. nothing
pub fn resolve_image(item: &FeedItem) -> Option<String> {
    if let Some(enclosure) = &item.enclosure {
        if enclosure.mime_type.contains("image") && !enclosure.url.trim().is_empty() {
            return Some(enclosure.url.trim().to_string());
        }
    }

    first_inline_image(&item.content)
}

/// `src` of the first `<img>` tag in `html`.
pub fn first_inline_image(html: &str) -> Option<String> {
    inline_img_src()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|src| !src.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Enclosure;

    fn item(content: &str, enclosure: Option<(&str, &str)>) -> FeedItem {
        FeedItem {
            title: "Beginner Guide to Baking".to_string(),
            content: content.to_string(),
            permalink: "https://example.com/baking".to_string(),
            enclosure: enclosure.map(|(url, mime_type)| Enclosure {
                url: url.to_string(),
                mime_type: mime_type.to_string(),
            }),
            published: None,
        }
    }

    #[test]
    fn test_image_enclosure_wins_over_inline() {
        let item = item(
            r#"<p><img src="https://example.com/inline.png"></p>"#,
            Some(("https://cdn.example.com/cover.jpg", "image/jpeg")),
        );
        assert_eq!(
            resolve_image(&item).as_deref(),
            Some("https://cdn.example.com/cover.jpg")
        );
    }

    #[test]
    fn test_non_image_enclosure_falls_back_to_inline() {
        let item = item(
            r#"<img class="hero" src='https://example.com/a.png' alt="a">"#,
            Some(("https://cdn.example.com/episode.mp3", "audio/mpeg")),
        );
        assert_eq!(
            resolve_image(&item).as_deref(),
            Some("https://example.com/a.png")
        );
    }

    #[test]
    fn test_first_inline_image_is_used() {
        let html = r#"<IMG SRC="https://example.com/1.png"><img src="https://example.com/2.png">"#;
        assert_eq!(
            first_inline_image(html).as_deref(),
            Some("https://example.com/1.png")
        );
    }

    #[test]
    fn test_data_src_is_not_src() {
        let html = r#"<img data-src="https://example.com/lazy.png" src="https://example.com/real.png">"#;
        assert_eq!(
            first_inline_image(html).as_deref(),
            Some("https://example.com/real.png")
        );
    }

    #[test]
    fn test_no_image_anywhere() {
        assert_eq!(resolve_image(&item("<p>No pictures</p>", None)), None);
    }

    #[test]
    fn test_enclosure_without_type_is_ignored() {
        let item = item("", Some(("https://cdn.example.com/file", "")));
        assert_eq!(resolve_image(&item), None);
    }
}
