//! Keyword matching for feed items.
//!
//! Keywords come from a single comma-separated setting. Matching is a plain
//! case-insensitive substring test over the title and the tag-stripped
//! content, so `cat` also matches `category`.

use crate::util::strip_tags;

/// Ordered, lowercased, trimmed keywords. Blank fragments are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Parses a comma-separated keyword list.
    ///
    /// ```
    /// use feedpress::filter::KeywordSet;
    ///
    /// let set = KeywordSet::parse(" Guide, BAKING ,, ");
    /// assert_eq!(set.as_slice(), ["guide", "baking"]);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let keywords = raw
            .to_lowercase()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the first keyword found in `title` or in `content` with its
    /// HTML tags removed, or `None`.
    pub fn first_match(&self, title: &str, content: &str) -> Option<&str> {
        if self.keywords.is_empty() {
            return None;
        }

        let title = title.to_lowercase();
        // Stripped lazily: most hits land on the title
        let mut text: Option<String> = None;

        for keyword in &self.keywords {
            if title.contains(keyword.as_str()) {
                return Some(keyword.as_str());
            }
            let text = text.get_or_insert_with(|| strip_tags(content).to_lowercase());
            if text.contains(keyword.as_str()) {
                return Some(keyword.as_str());
            }
        }
        None
    }

    /// True iff at least one keyword occurs in the title or stripped content.
    pub fn matches(&self, title: &str, content: &str) -> bool {
        self.first_match(title, content).is_some()
    }
}
