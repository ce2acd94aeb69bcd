use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser::{self, ParseFeedError};

/// Media attached to a feed item (`<enclosure>` in RSS, `rel="enclosure"`
/// links in Atom).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// Declared MIME type; empty when the feed does not state one.
    pub mime_type: String,
}

/// One entry of a fetched feed, normalized for the publishing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    /// Raw HTML body (`content:encoded`, falling back to the summary).
    pub content: String,
    pub permalink: String,
    pub enclosure: Option<Enclosure>,
    pub published: Option<DateTime<Utc>>,
}

/// Parses RSS/Atom bytes and returns at most `limit` items in feed order.
pub fn parse_feed(bytes: &[u8], limit: usize) -> Result<Vec<FeedItem>, ParseFeedError> {
    let feed = parser::parse(bytes)?;

    Ok(feed
        .entries
        .into_iter()
        .take(limit)
        .map(normalize_entry)
        .collect())
}

fn normalize_entry(entry: Entry) -> FeedItem {
    let enclosure = select_enclosure(&entry);

    let permalink = entry
        .links
        .iter()
        .find(|l| !is_enclosure_rel(l.rel.as_deref()))
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let content = entry
        .content
        .and_then(|c| c.body)
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();

    FeedItem {
        title,
        content,
        permalink,
        enclosure,
        published: entry.published.or(entry.updated),
    }
}

fn is_enclosure_rel(rel: Option<&str>) -> bool {
    rel.is_some_and(|r| r.eq_ignore_ascii_case("enclosure"))
}

fn select_enclosure(entry: &Entry) -> Option<Enclosure> {
    let from_media = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| {
            let url = c.url.as_ref()?.as_str().trim();
            if url.is_empty() {
                return None;
            }
            Some(Enclosure {
                url: url.to_string(),
                mime_type: c
                    .content_type
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
            })
        });

    from_media.or_else(|| {
        entry
            .links
            .iter()
            .find(|l| is_enclosure_rel(l.rel.as_deref()) && !l.href.trim().is_empty())
            .map(|l| Enclosure {
                url: l.href.trim().to_string(),
                mime_type: l.media_type.clone().unwrap_or_default(),
            })
    })
}
