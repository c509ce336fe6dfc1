//! Tech Watch: binary entrypoint
//! Boots the Axum HTTP server: config, classifier, favorites, initial snapshot, routes.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use tech_watch::classify::Classifier;
use tech_watch::config::AppConfig;
use tech_watch::favorites::JsonFileFavorites;
use tech_watch::ingest::fetch::HttpFeedFetcher;
use tech_watch::metrics::Metrics;
use tech_watch::{api, init_tracing, AppState, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::load_default().context("loading app config")?;
    let classifier = Arc::new(Classifier::load(config.classifier.keywords_path.as_deref())?);
    let store = JsonFileFavorites::new(&config.data.favorites_dir);
    info!(path = %store.path().display(), "favorites store");

    let mut session = Session::new(classifier, Box::new(store));
    match session.load_snapshot(&config.data.entries_path, &config.data.feeds_path) {
        Ok(report) => info!(kept = report.kept, "initial snapshot loaded"),
        Err(e) => warn!(error = ?e, "no snapshot loaded; starting empty"),
    }

    let fetcher = Arc::new(HttpFeedFetcher::new(&config.fetch)?);
    let metrics = Metrics::init()?;
    let bind = config.server.bind.clone();

    let state = AppState::new(session, fetcher, config);
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, "tech-watch listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
