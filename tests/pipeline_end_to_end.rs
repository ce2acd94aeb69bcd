//! End-to-end pipeline runs against mock HTTP feeds.
//!
//! Feeds are served by wiremock on localhost, so every fetcher here uses
//! `HostPolicy::AllowPrivate`. Entries land in a `MemoryRepository` unless
//! the test exercises the REST repository.

use feedpress::config::{MemorySettings, PipelineSettings, CATEGORY_KEY, FEED_URLS_KEY, KEYWORDS_KEY};
use feedpress::feed::{FetchOptions, HttpFeedFetcher};
use feedpress::pipeline::Pipeline;
use feedpress::repository::{MemoryRepository, RestCredentials, RestRepository};
use feedpress::rewrite::ContentTransformer;
use feedpress::util::HostPolicy;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BAKING_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Kitchen Notes</title>
    <link>https://kitchen.example.com</link>
    <description>Recipes</description>
    <item>
      <title>Beginner Guide to Baking</title>
      <link>https://kitchen.example.com/beginner-guide</link>
      <description><![CDATA[<p>Bread is easy.</p><img src="https://kitchen.example.com/loaf.jpg">]]></description>
    </item>
    <item>
      <title>Stock market update</title>
      <link>https://kitchen.example.com/stocks</link>
      <description><![CDATA[<p>Numbers went up.</p>]]></description>
    </item>
  </channel>
</rss>"#;

fn fetcher() -> HttpFeedFetcher {
    HttpFeedFetcher::new(
        reqwest::Client::new(),
        FetchOptions {
            host_policy: HostPolicy::AllowPrivate,
            ..FetchOptions::default()
        },
    )
}

fn settings(feed_urls: &str, keywords: &str) -> PipelineSettings {
    let mut store = MemorySettings::new();
    store
        .set(FEED_URLS_KEY, feed_urls)
        .set(KEYWORDS_KEY, keywords)
        .set(CATEGORY_KEY, "3");
    PipelineSettings::from_store(&store)
}

fn transformer() -> ContentTransformer {
    ContentTransformer::with_default_rules().unwrap()
}

async fn serve_feed(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_matching_item_is_published_once_with_attribution() {
    let server = MockServer::start().await;
    serve_feed(&server, "/feed.xml", BAKING_FEED).await;

    let pipeline = Pipeline::new(fetcher(), MemoryRepository::new(), transformer());
    let report = pipeline
        .run(
            &settings(&format!("{}/feed.xml", server.uri()), "guide"),
            &mut StdRng::seed_from_u64(1),
        )
        .await;

    assert_eq!(report.feeds_attempted, 1);
    assert_eq!(report.items_seen, 2);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.published, 1);

    let entries = pipeline.repository().entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0].entry;
    assert_eq!(entry.title, "Beginner Guide to Baking");
    assert_eq!(entry.category, 3);
    assert!(entry.body.ends_with(
        "<hr><p><strong>Source:</strong> \
         <a href=\"https://kitchen.example.com/beginner-guide\" target=\"_blank\" \
         rel=\"nofollow noopener\">Beginner Guide to Baking</a></p>"
    ));

    // Inline image becomes the featured image
    let media = pipeline.repository().media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].source_url, "https://kitchen.example.com/loaf.jpg");
    assert_eq!(entries[0].featured_media, Some(media[0].id));
}

#[tokio::test]
async fn test_second_run_does_not_republish() {
    let server = MockServer::start().await;
    serve_feed(&server, "/feed.xml", BAKING_FEED).await;

    let pipeline = Pipeline::new(fetcher(), MemoryRepository::new(), transformer());
    let settings = settings(&format!("{}/feed.xml", server.uri()), "guide");
    let mut rng = StdRng::seed_from_u64(2);

    pipeline.run(&settings, &mut rng).await;
    let second = pipeline.run(&settings, &mut rng).await;

    assert_eq!(second.duplicates, 1);
    assert_eq!(second.published, 0);
    assert_eq!(pipeline.repository().entries().len(), 1);
}

#[tokio::test]
async fn test_existing_title_publishes_nothing() {
    let server = MockServer::start().await;
    serve_feed(&server, "/feed.xml", BAKING_FEED).await;

    let pipeline = Pipeline::new(
        fetcher(),
        MemoryRepository::with_existing_titles(["Beginner Guide to Baking"]),
        transformer(),
    );
    let report = pipeline
        .run(
            &settings(&format!("{}/feed.xml", server.uri()), "guide"),
            &mut StdRng::seed_from_u64(3),
        )
        .await;

    assert_eq!(report.duplicates, 1);
    assert!(pipeline.repository().entries().is_empty());
}

#[tokio::test]
async fn test_failing_feed_completes_with_no_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(fetcher(), MemoryRepository::new(), transformer());
    let report = pipeline
        .run(
            &settings(&format!("{}/feed.xml", server.uri()), "guide"),
            &mut StdRng::seed_from_u64(4),
        )
        .await;

    assert_eq!(report.feeds_attempted, 1);
    assert_eq!(report.feeds_failed, 1);
    assert!(pipeline.repository().entries().is_empty());
}

#[tokio::test]
async fn test_bad_feed_is_skipped_and_next_feed_processed() {
    let server = MockServer::start().await;
    serve_feed(&server, "/broken.xml", "<html>not a feed</html>").await;
    serve_feed(&server, "/feed.xml", BAKING_FEED).await;

    let urls = format!(
        "{uri}/broken.xml\n\n{uri}/feed.xml\n",
        uri = server.uri()
    );
    let pipeline = Pipeline::new(fetcher(), MemoryRepository::new(), transformer());
    let report = pipeline
        .run(&settings(&urls, "baking"), &mut StdRng::seed_from_u64(5))
        .await;

    assert_eq!(report.feeds_attempted, 2);
    assert_eq!(report.feeds_failed, 1);
    assert_eq!(report.published, 1);
}

#[tokio::test]
async fn test_empty_settings_never_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BAKING_FEED))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(fetcher(), MemoryRepository::new(), transformer());
    let url = format!("{}/feed.xml", server.uri());

    let no_keywords = pipeline
        .run(&settings(&url, ""), &mut StdRng::seed_from_u64(6))
        .await;
    let no_feeds = pipeline
        .run(&settings("", "guide"), &mut StdRng::seed_from_u64(6))
        .await;

    assert_eq!(no_keywords.feeds_attempted, 0);
    assert_eq!(no_feeds.feeds_attempted, 0);
    assert!(pipeline.repository().entries().is_empty());
}

#[tokio::test]
async fn test_publishes_through_rest_repository() {
    let server = MockServer::start().await;
    let feed = BAKING_FEED.replace(
        "https://kitchen.example.com/loaf.jpg",
        &format!("{}/images/loaf.jpg", server.uri()),
    );
    serve_feed(&server, "/feed.xml", &feed).await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        // One title lookup per feed item
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(body_partial_json(serde_json::json!({
            "title": "Beginner Guide to Baking",
            "status": "publish",
            "categories": [3],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id": 41}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/loaf.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/media"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id": 77}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts/41"))
        .and(body_partial_json(serde_json::json!({ "featured_media": 77 })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": 41}"#))
        .expect(1)
        .mount(&server)
        .await;

    let repository = RestRepository::new(
        reqwest::Client::new(),
        &server.uri(),
        Some(RestCredentials {
            username: "editor".to_string(),
            app_password: "abcd efgh".to_string().into(),
        }),
    )
    .unwrap()
    .with_media_policy(HostPolicy::AllowPrivate);

    let pipeline = Pipeline::new(fetcher(), repository, transformer());
    let report = pipeline
        .run(
            &settings(&format!("{}/feed.xml", server.uri()), "guide"),
            &mut StdRng::seed_from_u64(7),
        )
        .await;

    assert_eq!(report.lookup_failures, 0);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.published, 1);
    assert_eq!(report.images_attached, 1);
    assert_eq!(report.image_failures, 0);
}
