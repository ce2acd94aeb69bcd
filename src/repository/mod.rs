//! The content repository the pipeline publishes into.
//!
//! The pipeline only needs four primitives, captured by
//! [`ContentRepository`]:
//!
//! - title lookup for deduplication
//! - entry creation
//! - media sideloading from a URL
//! - setting an entry's featured image
//!
//! Two implementations ship with the crate:
//!
//! - [`RestRepository`] - a WordPress-compatible REST API (`/wp-json/wp/v2`)
//! - [`MemoryRepository`] - in-process store for `--dry-run` and tests

mod memory;
mod rest;

use crate::feed::FetchError;
use crate::util::UrlValidationError;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use memory::{MemoryRepository, StoredEntry, StoredMedia};
pub use rest::{RestCredentials, RestRepository};

pub type EntryId = u64;
pub type MediaId = u64;

/// Publication state requested for a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Publish,
    Draft,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Publish => "publish",
            EntryStatus::Draft => "draft",
        }
    }
}

/// Everything needed to create one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub title: String,
    /// HTML body, attribution block included.
    pub body: String,
    pub status: EntryStatus,
    pub author: u64,
    pub category: u64,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Repository request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Repository returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Invalid repository URL: {0}")]
    InvalidSiteUrl(String),

    #[error("Invalid media URL: {0}")]
    InvalidMediaUrl(#[from] UrlValidationError),

    #[error("Media download failed: {0}")]
    MediaDownload(#[from] FetchError),

    #[error("Media is not an image (content type '{0}')")]
    NotAnImage(String),

    #[error("Entry {0} not found")]
    EntryNotFound(EntryId),
}

/// Create/read/update primitives of the external content store.
///
/// Implementations must be safe to share across tasks; the pipeline itself
/// calls them strictly one at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Whether an entry with exactly this title already exists.
    async fn exists_by_title(&self, title: &str) -> Result<bool, RepositoryError>;

    /// Creates an entry and returns its id.
    async fn create_entry(&self, entry: &NewEntry) -> Result<EntryId, RepositoryError>;

    /// Downloads `source_url` into the media library, attached to
    /// `entry_id`, and returns the new media id.
    async fn attach_media(
        &self,
        source_url: &str,
        entry_id: EntryId,
        alt_text: &str,
    ) -> Result<MediaId, RepositoryError>;

    async fn set_featured_image(
        &self,
        entry_id: EntryId,
        media_id: MediaId,
    ) -> Result<(), RepositoryError>;
}
