use super::{ContentRepository, EntryId, MediaId, NewEntry, RepositoryError};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: EntryId,
    pub entry: NewEntry,
    pub featured_media: Option<MediaId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub id: MediaId,
    pub source_url: String,
    pub entry_id: EntryId,
    pub alt_text: String,
}

#[derive(Debug, Default)]
struct State {
    existing_titles: Vec<String>,
    entries: Vec<StoredEntry>,
    media: Vec<StoredMedia>,
    next_id: u64,
}

/// Repository that keeps everything in memory.
///
/// Ids are shared between entries and media and start at 1. Media is
/// recorded, never downloaded.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository that already holds entries with these titles.
    pub fn with_existing_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::default();
        repo.lock().existing_titles = titles.into_iter().map(Into::into).collect();
        repo
    }

    pub fn entries(&self) -> Vec<StoredEntry> {
        self.lock().entries.clone()
    }

    pub fn media(&self) -> Vec<StoredMedia> {
        self.lock().media.clone()
    }

    // A panic in another holder cannot leave State half-written; keep going
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn exists_by_title(&self, title: &str) -> Result<bool, RepositoryError> {
        let state = self.lock();
        Ok(state.existing_titles.iter().any(|t| t == title)
            || state.entries.iter().any(|e| e.entry.title == title))
    }

    async fn create_entry(&self, entry: &NewEntry) -> Result<EntryId, RepositoryError> {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.entries.push(StoredEntry {
            id,
            entry: entry.clone(),
            featured_media: None,
        });
        Ok(id)
    }

    async fn attach_media(
        &self,
        source_url: &str,
        entry_id: EntryId,
        alt_text: &str,
    ) -> Result<MediaId, RepositoryError> {
        let mut state = self.lock();
        if !state.entries.iter().any(|e| e.id == entry_id) {
            return Err(RepositoryError::EntryNotFound(entry_id));
        }
        let id = state.allocate_id();
        state.media.push(StoredMedia {
            id,
            source_url: source_url.to_string(),
            entry_id,
            alt_text: alt_text.to_string(),
        });
        Ok(id)
    }

    async fn set_featured_image(
        &self,
        entry_id: EntryId,
        media_id: MediaId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or(RepositoryError::EntryNotFound(entry_id))?;
        entry.featured_media = Some(media_id);
        Ok(())
    }
}
