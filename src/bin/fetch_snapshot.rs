//! Batch fetcher: pulls every configured feed once and writes the snapshot
//! documents the server loads at startup and on `/reload`.

use anyhow::Context;
use tracing::{info, warn};

use tech_watch::classify::Classifier;
use tech_watch::config::AppConfig;
use tech_watch::ingest::{self, fetch::HttpFeedFetcher, snapshot};
use tech_watch::query::sort_newest_first;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tech_watch::init_tracing();

    let config = AppConfig::load_default().context("loading app config")?;
    let data = &config.data;

    let feeds = snapshot::load_sources(&data.sources_path)?;
    info!(sources = feeds.len(), path = %data.sources_path.display(), "fetching feeds");
    let classifier = Classifier::load(config.classifier.keywords_path.as_deref())?;
    let fetcher = HttpFeedFetcher::new(&config.fetch)?;

    let mut batch = ingest::run_live(feeds, &fetcher, &classifier).await;
    for id in &batch.report.failed_sources {
        warn!(source = %id, "source skipped");
    }
    sort_newest_first(&mut batch.items);

    snapshot::write_snapshot(
        &data.entries_path,
        &data.feeds_path,
        batch.generated_at,
        &batch.items,
        &batch.feeds,
    )?;
    info!(
        items = batch.items.len(),
        entries = %data.entries_path.display(),
        "snapshot written"
    );
    Ok(())
}
