//! One pass of the content pipeline.
//!
//! For every configured feed URL, in order:
//!
//! ```text
//! fetch ─► for each item: dedupe ─► keyword filter ─► transform
//!          ─► compose body ─► publish ─► resolve image ─► attach image
//! ```
//!
//! Nothing in here is fatal. A feed that fails to fetch is skipped, an
//! item that fails to publish is skipped, and an image that fails to attach
//! leaves its entry published without one. Every outcome is counted in the
//! returned [`RunReport`].

use crate::config::PipelineSettings;
use crate::feed::{FeedFetcher, FeedItem};
use crate::image::resolve_image;
use crate::repository::{ContentRepository, EntryId, EntryStatus, NewEntry, RepositoryError};
use crate::rewrite::ContentTransformer;
use crate::util::{escape_html, sanitize_html, strip_tags};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use url::Url;

/// Fixed fields of every entry the pipeline creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    pub author: u64,
    pub status: EntryStatus,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            author: crate::config::DEFAULT_AUTHOR,
            status: EntryStatus::Publish,
        }
    }
}

/// Counters for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub feeds_attempted: usize,
    pub feeds_failed: usize,
    pub items_seen: usize,
    pub duplicates: usize,
    /// Title lookups that errored; those items are skipped.
    pub lookup_failures: usize,
    pub unmatched: usize,
    pub published: usize,
    pub publish_failures: usize,
    pub images_attached: usize,
    pub image_failures: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} → {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.finished_at.format("%H:%M:%S UTC")
        )?;
        writeln!(
            f,
            "  feeds:     {} attempted, {} failed",
            self.feeds_attempted, self.feeds_failed
        )?;
        writeln!(
            f,
            "  items:     {} seen, {} duplicate, {} unmatched, {} lookup errors",
            self.items_seen, self.duplicates, self.unmatched, self.lookup_failures
        )?;
        writeln!(
            f,
            "  published: {} ({} failed)",
            self.published, self.publish_failures
        )?;
        write!(
            f,
            "  images:    {} attached, {} failed",
            self.images_attached, self.image_failures
        )
    }
}

/// What happened to one feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Duplicate,
    LookupFailed,
    Unmatched,
    PublishFailed,
    Published { image: ImageOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageOutcome {
    None,
    Attached,
    Failed,
}

impl RunReport {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Duplicate => self.duplicates += 1,
            ItemOutcome::LookupFailed => self.lookup_failures += 1,
            ItemOutcome::Unmatched => self.unmatched += 1,
            ItemOutcome::PublishFailed => self.publish_failures += 1,
            ItemOutcome::Published { image } => {
                self.published += 1;
                match image {
                    ImageOutcome::None => {}
                    ImageOutcome::Attached => self.images_attached += 1,
                    ImageOutcome::Failed => self.image_failures += 1,
                }
            }
        }
    }
}

/// Whether the repository already holds an entry titled `title`.
pub async fn is_duplicate<R>(repository: &R, title: &str) -> Result<bool, RepositoryError>
where
    R: ContentRepository + ?Sized,
{
    repository.exists_by_title(title).await
}

/// Transformed content followed by the source attribution block.
///
/// The permalink is escaped for use inside the `href` attribute and the
/// title for use as element text. A permalink that is not an absolute
/// `http`/`https` URL is dropped and the title is shown without a link.
pub fn compose_body(content: &str, title: &str, permalink: &str) -> String {
    let title = escape_html(title);
    match safe_link(permalink) {
        Some(href) => format!(
            "{content}<hr><p><strong>Source:</strong> <a href=\"{}\" target=\"_blank\" rel=\"nofollow noopener\">{title}</a></p>",
            escape_html(href),
        ),
        None => format!("{content}<hr><p><strong>Source:</strong> {title}</p>"),
    }
}

fn safe_link(permalink: &str) -> Option<&str> {
    let trimmed = permalink.trim();
    let url = Url::parse(trimmed).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(trimmed)
}

/// Title used for the duplicate check, the entry, and the image alt text.
fn clean_title(raw: &str) -> String {
    strip_tags(raw).trim().to_string()
}

/// Runs the pipeline against a fetcher and a repository.
pub struct Pipeline<F, R> {
    fetcher: F,
    repository: R,
    transformer: ContentTransformer,
    options: PublishOptions,
}

impl<F, R> Pipeline<F, R>
where
    F: FeedFetcher,
    R: ContentRepository,
{
    pub fn new(fetcher: F, repository: R, transformer: ContentTransformer) -> Self {
        Self {
            fetcher,
            repository,
            transformer,
            options: PublishOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PublishOptions) -> Self {
        self.options = options;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Executes one full pass.
    ///
    /// With no feed URLs or no keywords this returns immediately without
    /// touching the fetcher or the repository.
    pub async fn run<G>(&self, settings: &PipelineSettings, rng: &mut G) -> RunReport
    where
        G: Rng + Send + ?Sized,
    {
        let mut report = RunReport {
            started_at: Utc::now(),
            ..RunReport::default()
        };

        if settings.is_noop() {
            tracing::info!(
                feeds = settings.feed_urls.len(),
                keywords = settings.keywords.len(),
                "Nothing to do: feed list or keyword list is empty"
            );
            report.finished_at = Utc::now();
            return report;
        }

        for url in &settings.feed_urls {
            report.feeds_attempted += 1;

            let items = match self.fetcher.fetch(url).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(feed = %url, error = %e, "Failed to fetch feed, skipping");
                    report.feeds_failed += 1;
                    continue;
                }
            };
            tracing::debug!(feed = %url, items = items.len(), "Fetched feed");

            for item in &items {
                report.items_seen += 1;
                let outcome = self.process_item(item, settings, &mut *rng).await;
                report.record(outcome);
            }
        }

        report.finished_at = Utc::now();
        tracing::info!(
            feeds = report.feeds_attempted,
            feeds_failed = report.feeds_failed,
            items = report.items_seen,
            duplicates = report.duplicates,
            unmatched = report.unmatched,
            published = report.published,
            publish_failures = report.publish_failures,
            images = report.images_attached,
            image_failures = report.image_failures,
            "Pipeline run finished"
        );
        report
    }

    async fn process_item<G>(
        &self,
        item: &FeedItem,
        settings: &PipelineSettings,
        rng: &mut G,
    ) -> ItemOutcome
    where
        G: Rng + Send + ?Sized,
    {
        let title = clean_title(&item.title);

        match is_duplicate(&self.repository, &title).await {
            Ok(true) => {
                tracing::debug!(title = %title, "Entry already exists, skipping");
                return ItemOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                // Publishing without a confirmed miss risks a double post
                tracing::warn!(title = %title, error = %e, "Title lookup failed, skipping");
                return ItemOutcome::LookupFailed;
            }
        }

        let Some(keyword) = settings.keywords.first_match(&item.title, &item.content) else {
            tracing::debug!(title = %title, "No keyword match, skipping");
            return ItemOutcome::Unmatched;
        };
        tracing::debug!(title = %title, keyword = %keyword, "Keyword matched");

        let transformed = self.transformer.transform(&item.content, &mut *rng);
        let body = compose_body(&sanitize_html(&transformed), &title, &item.permalink);

        let entry = NewEntry {
            title: title.clone(),
            body,
            status: self.options.status,
            author: self.options.author,
            category: settings.category,
        };

        let entry_id = match self.repository.create_entry(&entry).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "Failed to publish entry");
                return ItemOutcome::PublishFailed;
            }
        };
        tracing::info!(
            title = %title,
            entry_id,
            permalink = %item.permalink,
            source_published = ?item.published,
            "Published entry"
        );

        let image = self.attach_featured_image(item, entry_id, &title).await;
        ItemOutcome::Published { image }
    }

    async fn attach_featured_image(
        &self,
        item: &FeedItem,
        entry_id: EntryId,
        title: &str,
    ) -> ImageOutcome {
        let Some(image_url) = resolve_image(item) else {
            return ImageOutcome::None;
        };

        let result = async {
            let media_id = self
                .repository
                .attach_media(&image_url, entry_id, title)
                .await?;
            self.repository
                .set_featured_image(entry_id, media_id)
                .await?;
            Ok::<_, RepositoryError>(media_id)
        }
        .await;

        match result {
            Ok(media_id) => {
                tracing::debug!(entry_id, media_id, image = %image_url, "Attached featured image");
                ImageOutcome::Attached
            }
            Err(e) => {
                tracing::warn!(
                    entry_id,
                    image = %image_url,
                    error = %e,
                    "Failed to attach featured image"
                );
                ImageOutcome::Failed
            }
        }
    }
}
