// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health, /items, /stats, /sources, /favorites
// - POST /filters (valid + invalid)
// - POST /favorites/{id}
// - POST /reload (success + failure keeps state)
// - POST /live

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use tech_watch::config::AppConfig;
use tech_watch::favorites::MemoryFavorites;
use tech_watch::ingest::types::{FeedFetcher, FeedSource};
use tech_watch::{api, AppState, Classifier, Session};

const BODY_LIMIT: usize = 1024 * 1024;

struct OneFeed;

#[async_trait]
impl FeedFetcher for OneFeed {
    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        match source.id.as_str() {
            "ng" => Ok(r#"<rss version="2.0"><channel>
<item><title>Angular live</title><link>https://ng.test/live</link>
<pubDate>Mon, 04 Mar 2024 09:00:00 +0000</pubDate></item>
</channel></rss>"#
                .to_string()),
            other => Err(anyhow!("{other} unreachable")),
        }
    }

    fn name(&self) -> &'static str {
        "one-feed"
    }
}

fn write_snapshot_docs(dir: &Path) {
    std::fs::write(
        dir.join("feeds.json"),
        json!([
            {"id": "ng", "name": "Angular Blog", "url": "https://ng.test/rss", "defaultTech": "Angular"},
            {"id": "jw", "name": "Java Weekly", "url": "https://jw.test/atom"}
        ])
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.join("entries.json"),
        json!({
            "generatedAt": "2024-03-10T12:00:00Z",
            "items": [
                {"id": "n1", "title": "Signals", "url": "https://ng.test/1",
                 "publishedAt": "2024-03-09T08:00:00Z", "sourceId": "ng"},
                {"id": "j1", "title": "Spring Boot news", "url": "https://jw.test/1",
                 "publishedAt": "2024-03-08T08:00:00Z", "sourceId": "jw"},
                {"id": "j2", "title": "JUnit 5 tricks", "url": "https://jw.test/2",
                 "sourceId": "jw"}
            ]
        })
        .to_string(),
    )
    .unwrap();
}

/// Router over a session preloaded from snapshot docs in `dir`.
fn test_router(dir: &Path) -> Router {
    write_snapshot_docs(dir);
    let mut config = AppConfig::default();
    config.data.entries_path = dir.join("entries.json");
    config.data.feeds_path = dir.join("feeds.json");

    let mut session = Session::new(
        Arc::new(Classifier::default()),
        Box::new(MemoryFavorites::new()),
    );
    session
        .load_snapshot(&config.data.entries_path, &config.data.feeds_path)
        .expect("snapshot loads");

    api::router(AppState::new(session, Arc::new(OneFeed), config))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Json) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).unwrap().trim(), "OK");
}

#[tokio::test]
async fn items_are_sorted_with_favorite_flags() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let (status, body) = send(&app, "GET", "/items", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["generatedAt"], "2024-03-10T12:00:00.000Z");
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["n1", "j1", "j2"]);
    assert_eq!(body["items"][0]["favorite"], false);
    assert_eq!(body["items"][0]["tech"], "Angular");
    assert_eq!(body["items"][2]["publishedAt"], Json::Null);
    assert_eq!(body["filters"]["tech"], "ALL");
}

#[tokio::test]
async fn filters_apply_and_invalid_filters_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let (status, body) = send(
        &app,
        "POST",
        "/filters",
        Some(json!({"tech": "Java", "q": "junit"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["id"], "j2");

    // filters stick for later reads
    let (_, body) = send(&app, "GET", "/items", None).await;
    assert_eq!(body["count"], 1);

    let (status, body) = send(&app, "POST", "/filters", Some(json!({"tech": "kotlin"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("kotlin"));

    let (status, _) = send(&app, "POST", "/filters", Some(json!({"age": -3}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // rejected filters leave the previous ones in place
    let (_, body) = send(&app, "GET", "/items", None).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn favorite_toggle_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let (status, body) = send(&app, "POST", "/favorites/j1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "j1", "favorite": true}));

    let (_, body) = send(&app, "GET", "/favorites", None).await;
    assert_eq!(body, json!(["j1"]));

    let (_, body) = send(&app, "POST", "/filters", Some(json!({"fav": true}))).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["favorite"], true);

    let (_, body) = send(&app, "POST", "/favorites/j1", None).await;
    assert_eq!(body["favorite"], false);
    let (_, body) = send(&app, "GET", "/items", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn stats_and_sources() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let (status, body) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["angular"], 1);
    assert_eq!(body["java"], 2);

    let (_, body) = send(&app, "GET", "/sources", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["defaultTech"], "Angular");
    assert_eq!(body[1]["defaultTech"], "Other");
}

#[tokio::test]
async fn failed_reload_keeps_collection() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    std::fs::write(dir.path().join("entries.json"), "not json").unwrap();
    let (status, body) = send(&app, "POST", "/reload", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (_, body) = send(&app, "GET", "/stats", None).await;
    assert_eq!(body["total"], 3);

    write_snapshot_docs(dir.path());
    let (status, body) = send(&app, "POST", "/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kept"], 3);
}

#[tokio::test]
async fn live_ingest_replaces_collection() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path());

    let (status, body) = send(&app, "POST", "/live", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kept"], 1);
    assert_eq!(body["failedSources"], json!(["jw"]));

    let (_, body) = send(&app, "GET", "/items", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["url"], "https://ng.test/live");
    assert_eq!(body["items"][0]["sourceName"], "Angular Blog");
}
