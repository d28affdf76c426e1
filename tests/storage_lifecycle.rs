//! Integration tests running the pipeline against the SQLite store.
//!
//! Each test creates its own in-memory database. Pages and the remote parser
//! API are served by wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fulltext::config::Config;
use fulltext::storage::{Database, Entry, Feed, IngestedEntry, NewFeed};
use fulltext::Enricher;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn test_config() -> Config {
    Config {
        request_timeout_secs: 5,
        // wiremock listens on 127.0.0.1
        allow_private_hosts: true,
        ..Config::default()
    }
}

async fn seed_feed(db: &Database, crawler: bool, remote_enrichment: bool) -> Feed {
    let user = db.create_user("alice").await.unwrap();
    let feed_id = db
        .insert_feed(&NewFeed {
            user_id: user.id,
            title: "Site".to_string(),
            feed_url: "https://site.example/feed.xml".to_string(),
            crawler,
            remote_enrichment,
            ..NewFeed::default()
        })
        .await
        .unwrap();
    db.get_feed(feed_id).await.unwrap()
}

fn ingested(url: &str, content: &str) -> IngestedEntry {
    serde_json::from_value(serde_json::json!({
        "url": url,
        "title": "Post",
        "content": content,
    }))
    .unwrap()
}

// ============================================================================
// Batch ingestion
// ============================================================================

#[tokio::test]
async fn test_batch_scrapes_once_then_dedups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><body><nav>menu</nav><article><p>Full story</p></article></body></html>",
                "text/html; charset=utf-8",
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let db = test_db().await;
    let feed = seed_feed(&db, true, false).await;
    let enricher = Enricher::new(&test_config(), Arc::new(db.clone())).unwrap();
    let url = format!("{}/post/1", server.uri());

    // First pass: new entry is scraped and stored
    let mut entries = vec![ingested(&url, "<p>Teaser</p>").into_entry(&feed)];
    let report = enricher.enrich_feed_entries(&feed, &mut entries).await;
    assert_eq!(report.replaced, 1);
    assert_eq!(db.upsert_entries(&entries).await.unwrap(), 1);

    let stored = db.get_entries_for_feed(feed.id, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "<p>Full story</p>");

    // Second pass: the same item shows up again and is not fetched
    let mut again = vec![ingested(&url, "<p>Teaser</p>").into_entry(&feed)];
    let report = enricher.enrich_feed_entries(&feed, &mut again).await;
    assert_eq!(report.duplicates, 1);
    assert_eq!(again[0].content, "<p>Teaser</p>");
    assert_eq!(db.upsert_entries(&again).await.unwrap(), 0);

    // Stored full content survives the re-ingest
    let stored = db.get_entries_for_feed(feed.id, None).await.unwrap();
    assert_eq!(stored[0].content, "<p>Full story</p>");
}

#[tokio::test]
async fn test_batch_uses_feed_scraper_rules_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post/2"))
        .and(header("user-agent", "FeedBot/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body><div class="ad">buy</div><div class="post-body"><p>Only this</p></div></body></html>"#,
            "text/html",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let db = test_db().await;
    let user = db.create_user("bob").await.unwrap();
    let feed_id = db
        .insert_feed(&NewFeed {
            user_id: user.id,
            title: "Ruled".to_string(),
            feed_url: "https://ruled.example/feed".to_string(),
            crawler: true,
            scraper_rules: ".post-body".to_string(),
            user_agent: "FeedBot/2.0".to_string(),
            ..NewFeed::default()
        })
        .await
        .unwrap();
    let feed = db.get_feed(feed_id).await.unwrap();
    let enricher = Enricher::new(&test_config(), Arc::new(db.clone())).unwrap();

    let mut entries = vec![Entry::new(
        &feed,
        &format!("{}/post/2", server.uri()),
        "Post",
        "",
    )];
    enricher.enrich_feed_entries(&feed, &mut entries).await;

    assert_eq!(entries[0].content, "<div><p>Only this</p></div>");
}

#[tokio::test]
async fn test_scraper_refuses_private_hosts_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>internal</p>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let db = test_db().await;
    let feed = seed_feed(&db, true, false).await;
    let config = Config {
        allow_private_hosts: false,
        ..test_config()
    };
    let enricher = Enricher::new(&config, Arc::new(db.clone())).unwrap();

    let mut entries = vec![Entry::new(
        &feed,
        &format!("{}/admin", server.uri()),
        "Post",
        "<p>Teaser</p>",
    )];
    let report = enricher.enrich_feed_entries(&feed, &mut entries).await;

    assert_eq!(report.failures, 1);
    assert_eq!(entries[0].content, "<p>Teaser</p>");
}

// ============================================================================
// On-demand fetch
// ============================================================================

#[tokio::test]
async fn test_endpoint_change_applies_without_touching_feed() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for (server, body) in [(&first, "<p>first</p>"), (&second, "<p>second</p>")] {
        Mock::given(method("GET"))
            .and(path("/parser"))
            .and(query_param("url", "https://site.example/post/9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": body })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    let db = test_db().await;
    let feed = seed_feed(&db, false, true).await;
    db.upsert_entries(&[Entry::new(
        &feed,
        "https://site.example/post/9",
        "Post",
        "<p>Teaser</p>",
    )])
    .await
    .unwrap();
    let entry_id = db.get_entries_for_feed(feed.id, None).await.unwrap()[0].id;
    let enricher = Enricher::new(&test_config(), Arc::new(db.clone())).unwrap();

    db.set_user_remote_api_url(feed.user_id, Some(&format!("{}/parser", first.uri())))
        .await
        .unwrap();
    let mut entry = db.get_entry(entry_id).await.unwrap();
    enricher.enrich_single_entry(&feed, &mut entry).await.unwrap();
    db.update_entry_content(entry.id, &entry.content).await.unwrap();
    assert_eq!(db.get_entry(entry_id).await.unwrap().content, "<p>first</p>");

    db.set_user_remote_api_url(feed.user_id, Some(&format!("{}/parser", second.uri())))
        .await
        .unwrap();
    let mut entry = db.get_entry(entry_id).await.unwrap();
    enricher.enrich_single_entry(&feed, &mut entry).await.unwrap();
    assert_eq!(entry.content, "<p>second</p>");
    assert_eq!(db.get_feed(feed.id).await.unwrap(), feed);
}

#[tokio::test]
async fn test_cleared_endpoint_is_configuration_error() {
    let db = test_db().await;
    let feed = seed_feed(&db, false, true).await;
    db.set_user_remote_api_url(feed.user_id, Some("http://api.example/parser"))
        .await
        .unwrap();
    db.set_user_remote_api_url(feed.user_id, Some(""))
        .await
        .unwrap();
    let enricher = Enricher::new(&test_config(), Arc::new(db.clone())).unwrap();

    let mut entry = Entry::new(&feed, "https://site.example/post/1", "Post", "<p>Teaser</p>");
    let err = enricher
        .enrich_single_entry(&feed, &mut entry)
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(entry.content, "<p>Teaser</p>");
}

#[tokio::test]
async fn test_bulk_content_update_after_on_demand_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parser"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "content": "<p>full</p>" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let db = test_db().await;
    let feed = seed_feed(&db, false, true).await;
    db.set_user_remote_api_url(feed.user_id, Some(&format!("{}/parser", server.uri())))
        .await
        .unwrap();
    db.upsert_entries(&[
        Entry::new(&feed, "https://site.example/a", "A", "<p>a</p>"),
        Entry::new(&feed, "https://site.example/b", "B", "<p>b</p>"),
    ])
    .await
    .unwrap();
    let enricher = Enricher::new(&test_config(), Arc::new(db.clone())).unwrap();

    let mut entries = db.get_entries_for_feed(feed.id, None).await.unwrap();
    for entry in entries.iter_mut() {
        enricher.enrich_single_entry(&feed, entry).await.unwrap();
    }
    assert_eq!(db.update_entries_content(&entries).await.unwrap(), 2);

    for entry in db.get_entries_for_feed(feed.id, None).await.unwrap() {
        assert_eq!(entry.content, "<p>full</p>");
    }
}
