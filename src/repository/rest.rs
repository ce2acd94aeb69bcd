use super::{ContentRepository, EntryId, MediaId, NewEntry, RepositoryError};
use crate::feed::{read_limited_bytes, FetchError};
use crate::util::{validate_url, HostPolicy};
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

const API_PREFIX: &str = "wp-json/wp/v2/";
const MAX_MEDIA_SIZE: usize = 20 * 1024 * 1024; // 20MB
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SEARCH_PAGE_SIZE: usize = 100;
/// Upper bound on title-search pages read per lookup.
const MAX_SEARCH_PAGES: u32 = 10;

/// Username plus application password for HTTP basic auth.
///
/// `SecretString` keeps the password out of `Debug` output.
#[derive(Debug)]
pub struct RestCredentials {
    pub username: String,
    pub app_password: SecretString,
}

/// [`ContentRepository`] speaking the WordPress REST API.
#[derive(Debug)]
pub struct RestRepository {
    client: reqwest::Client,
    api_base: Url,
    credentials: Option<RestCredentials>,
    media_policy: HostPolicy,
    max_media_bytes: usize,
    request_timeout: Duration,
}

#[derive(Deserialize)]
struct Created {
    id: u64,
}

#[derive(Deserialize)]
struct PostSummary {
    title: TitleField,
}

#[derive(Deserialize)]
struct TitleField {
    raw: Option<String>,
    rendered: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl RestRepository {
    /// Points the repository at a site root such as `https://blog.example.com/`.
    ///
    /// The site may live below a path (`https://example.com/blog`); a
    /// trailing slash is added so endpoint joins stay under it.
    pub fn new(
        client: reqwest::Client,
        site_url: &str,
        credentials: Option<RestCredentials>,
    ) -> Result<Self, RepositoryError> {
        let mut site = validate_url(site_url, HostPolicy::AllowPrivate)
            .map_err(|e| RepositoryError::InvalidSiteUrl(e.to_string()))?;
        if !site.path().ends_with('/') {
            let path = format!("{}/", site.path());
            site.set_path(&path);
        }
        let api_base = site
            .join(API_PREFIX)
            .map_err(|e| RepositoryError::InvalidSiteUrl(e.to_string()))?;

        Ok(Self {
            client,
            api_base,
            credentials,
            media_policy: HostPolicy::PublicOnly,
            max_media_bytes: MAX_MEDIA_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Which hosts images may be downloaded from (public only by default).
    pub fn with_media_policy(mut self, policy: HostPolicy) -> Self {
        self.media_policy = policy;
        self
    }

    pub fn with_max_media_bytes(mut self, limit: usize) -> Self {
        self.max_media_bytes = limit;
        self
    }

    /// Deadline for each API call and image download, body included.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, RepositoryError> {
        self.api_base
            .join(path)
            .map_err(|e| RepositoryError::InvalidSiteUrl(format!("{path}: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.timeout(self.request_timeout);
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(c.app_password.expose_secret())),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RepositoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.message)
            .unwrap_or(text);
        Err(RepositoryError::HttpStatus {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ContentRepository for RestRepository {
    /// Pages through the title search until an exact match is found or
    /// the results run out (at most `MAX_SEARCH_PAGES` pages).
    async fn exists_by_title(&self, title: &str) -> Result<bool, RepositoryError> {
        let mut page = 1;
        loop {
            let mut url = self.endpoint("posts")?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("search", title)
                    .append_pair("per_page", &SEARCH_PAGE_SIZE.to_string())
                    .append_pair("page", &page.to_string())
                    .append_pair("_fields", "id,title");
                // Drafts and scheduled posts count as existing, but listing them needs auth
                if self.credentials.is_some() {
                    query.append_pair("status", "any").append_pair("context", "edit");
                }
            }

            let response = Self::check(self.authorize(self.client.get(url)).send().await?).await?;
            let total_pages = response
                .headers()
                .get("x-wp-totalpages")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(1);
            let posts: Vec<PostSummary> = response.json().await?;

            if posts.iter().any(|p| {
                p.title.raw.as_deref() == Some(title) || p.title.rendered.as_deref() == Some(title)
            }) {
                return Ok(true);
            }
            if page >= total_pages || posts.len() < SEARCH_PAGE_SIZE {
                return Ok(false);
            }
            if page >= MAX_SEARCH_PAGES {
                tracing::warn!(
                    title = %title,
                    total_pages,
                    "Title search has more pages than checked, treating as new"
                );
                return Ok(false);
            }
            page += 1;
        }
    }

    async fn create_entry(&self, entry: &NewEntry) -> Result<EntryId, RepositoryError> {
        let body = json!({
            "title": entry.title,
            "content": entry.body,
            "status": entry.status,
            "author": entry.author,
            "categories": [entry.category],
        });

        let response = self
            .authorize(self.client.post(self.endpoint("posts")?))
            .json(&body)
            .send()
            .await?;
        let created: Created = Self::check(response).await?.json().await?;

        tracing::debug!(entry_id = created.id, title = %entry.title, "Entry created");
        Ok(created.id)
    }

    async fn attach_media(
        &self,
        source_url: &str,
        entry_id: EntryId,
        alt_text: &str,
    ) -> Result<MediaId, RepositoryError> {
        let source = validate_url(source_url, self.media_policy)?;

        let download = self
            .client
            .get(source.as_str())
            .timeout(self.request_timeout)
            .send()
            .await?;
        if !download.status().is_success() {
            return Err(FetchError::HttpStatus(download.status().as_u16()).into());
        }

        let content_type = download
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(RepositoryError::NotAnImage(content_type));
        }

        let bytes = read_limited_bytes(download, self.max_media_bytes).await?;
        let filename = media_filename(&source, &content_type);

        let mut url = self.endpoint("media")?;
        url.query_pairs_mut()
            .append_pair("post", &entry_id.to_string())
            .append_pair("alt_text", alt_text)
            .append_pair("title", alt_text);

        let response = self
            .authorize(self.client.post(url))
            .header(CONTENT_TYPE, content_type.as_str())
            .header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )
            .body(bytes)
            .send()
            .await?;
        let created: Created = Self::check(response).await?.json().await?;

        tracing::debug!(entry_id, media_id = created.id, source = %source, "Media uploaded");
        Ok(created.id)
    }

    async fn set_featured_image(
        &self,
        entry_id: EntryId,
        media_id: MediaId,
    ) -> Result<(), RepositoryError> {
        let response = self
            .authorize(self.client.post(self.endpoint(&format!("posts/{entry_id}"))?))
            .json(&json!({ "featured_media": media_id }))
            .send()
            .await?;

        match Self::check(response).await {
            Ok(_) => Ok(()),
            Err(RepositoryError::HttpStatus { status: 404, .. }) => {
                Err(RepositoryError::EntryNotFound(entry_id))
            }
            Err(e) => Err(e),
        }
    }
}

/// File name for an uploaded image: the URL's last path segment reduced to
/// `[A-Za-z0-9._-]`, with an extension from the content type when missing.
fn media_filename(source: &Url, content_type: &str) -> String {
    let segment = source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let mut name: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if name.trim_matches('.').is_empty() {
        name = "image".to_string();
    }

    if !name.contains('.') {
        let subtype = content_type
            .strip_prefix("image/")
            .and_then(|s| s.split('+').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("jpg");
        name.push('.');
        name.push_str(subtype);
    }
    name
}
