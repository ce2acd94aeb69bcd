//! Feed ingestion: HTTP retrieval and RSS/Atom normalization.
//!
//! - [`parser`] - converts feed XML into [`FeedItem`]s using `feed-rs`
//! - [`fetcher`] - the [`FeedFetcher`] seam and its `reqwest` implementation
//!
//! # Example
//!
//! ```ignore
//! use feedpress::feed::{FeedFetcher, FetchOptions, HttpFeedFetcher};
//!
//! let fetcher = HttpFeedFetcher::new(reqwest::Client::new(), FetchOptions::default());
//! let items = fetcher.fetch("https://example.com/feed.xml").await?;
//! ```

mod fetcher;
mod parser;

#[cfg(test)]
pub use fetcher::MockFeedFetcher;
pub use fetcher::{FeedFetcher, FetchError, FetchOptions, HttpFeedFetcher, DEFAULT_MAX_ITEMS};
pub(crate) use fetcher::read_limited_bytes;
pub use parser::{parse_feed, Enclosure, FeedItem};
