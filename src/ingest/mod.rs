// src/ingest/mod.rs
pub mod date;
pub mod feed;
pub mod fetch;
pub mod normalize;
pub mod sanitize;
pub mod snapshot;
pub mod types;

use crate::classify::Classifier;
use crate::ingest::normalize::normalize_item;
use crate::ingest::snapshot::SnapshotDoc;
use crate::ingest::types::{FeedFetcher, FeedSource, NormalizedItem, RawEntry};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Raw entries handed to the normalizer.");
        describe_counter!("ingest_kept_total", "Items kept after deduplication.");
        describe_counter!("ingest_dedup_total", "Items removed by deduplication.");
        describe_counter!(
            "ingest_source_errors_total",
            "Per-source fetch/parse failures (label: kind)."
        );
        describe_counter!("ingest_runs_total", "Completed ingestion runs (label: mode).");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when an ingestion run last completed."
        );
    });
}

/// What happened during one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub entries: usize,
    pub kept: usize,
    pub duplicates: usize,
    /// Ids of sources that contributed nothing because of a fetch/parse error.
    pub failed_sources: Vec<String>,
}

/// A complete replacement for the session's collection.
#[derive(Debug, Clone, Default)]
pub struct IngestBatch {
    pub feeds: Vec<FeedSource>,
    pub generated_at: Option<DateTime<Utc>>,
    pub items: Vec<NormalizedItem>,
    pub report: IngestReport,
}

/// Keep the first occurrence of each dedup key (`id`, else `url`), in order.
/// Items without any key are dropped.
pub fn dedupe(items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    dedupe_counted(items).0
}

/// `dedupe` plus the number of discarded items (duplicates and keyless).
pub fn dedupe_counted(items: Vec<NormalizedItem>) -> (Vec<NormalizedItem>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for it in items {
        let fresh = match it.dedup_key() {
            Some(k) => seen.insert(k.to_string()),
            None => false,
        };
        if fresh {
            keep.push(it);
        } else {
            dropped += 1;
        }
    }

    (keep, dropped)
}

/// Normalize per-source groups in the given order, then deduplicate the whole
/// batch. Group order is precedence order.
pub fn normalize_groups<'a, I>(groups: I, classifier: &Classifier) -> (Vec<NormalizedItem>, IngestReport)
where
    I: IntoIterator<Item = (&'a FeedSource, Vec<RawEntry>)>,
{
    let mut normalized = Vec::new();
    for (source, entries) in groups {
        normalized.extend(entries.iter().map(|raw| normalize_item(raw, source, classifier)));
    }
    let entries = normalized.len();
    let (items, duplicates) = dedupe_counted(normalized);

    let report = IngestReport {
        entries,
        kept: items.len(),
        duplicates,
        failed_sources: Vec::new(),
    };
    (items, report)
}

fn record_run(mode: &'static str, report: &IngestReport) {
    ensure_metrics_described();
    let now = Utc::now().timestamp().max(0);
    counter!("ingest_entries_total").increment(report.entries as u64);
    counter!("ingest_kept_total").increment(report.kept as u64);
    counter!("ingest_dedup_total").increment(report.duplicates as u64);
    counter!("ingest_runs_total", "mode" => mode).increment(1);
    gauge!("ingest_last_run_ts").set(now as f64);

    tracing::info!(
        target: "ingest",
        mode,
        entries = report.entries,
        kept = report.kept,
        duplicates = report.duplicates,
        failed = report.failed_sources.len(),
        "ingest run finished"
    );
}

/// Build a batch from a loaded snapshot and its source list.
/// Entries are attributed to the source named by their `sourceId`; unknown ids
/// get a synthesized descriptor.
pub fn from_snapshot(doc: SnapshotDoc, feeds: Vec<FeedSource>, classifier: &Classifier) -> IngestBatch {
    let by_id: HashMap<&str, &FeedSource> = feeds.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut normalized = Vec::with_capacity(doc.items.len());
    for entry in &doc.items {
        let raw = entry.to_raw();
        let known = raw
            .source_id
            .as_deref()
            .and_then(|id| by_id.get(id.trim()).copied());
        let item = match known {
            Some(source) => normalize_item(&raw, source, classifier),
            None => {
                let source =
                    FeedSource::synthesized(raw.source_id.as_deref(), raw.source_name.as_deref());
                normalize_item(&raw, &source, classifier)
            }
        };
        normalized.push(item);
    }

    let entries = normalized.len();
    let (items, duplicates) = dedupe_counted(normalized);
    let report = IngestReport {
        entries,
        kept: items.len(),
        duplicates,
        failed_sources: Vec::new(),
    };
    record_run("snapshot", &report);

    IngestBatch {
        generated_at: doc.generated_at(),
        feeds,
        items,
        report,
    }
}

/// Load both snapshot documents and build a batch. Any read/parse error is
/// returned; nothing is partially applied.
pub fn load_snapshot_batch(
    entries_path: &Path,
    feeds_path: &Path,
    classifier: &Classifier,
) -> anyhow::Result<IngestBatch> {
    let (doc, feeds) = snapshot::load_snapshot(entries_path, feeds_path)?;
    Ok(from_snapshot(doc, feeds, classifier))
}

async fn fetch_source(fetcher: &dyn FeedFetcher, source: &FeedSource) -> Option<Vec<RawEntry>> {
    let body = match fetcher.fetch(source).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = ?e, source = %source.id, fetcher = fetcher.name(), "feed fetch failed");
            counter!("ingest_source_errors_total", "kind" => "fetch").increment(1);
            return None;
        }
    };
    match feed::parse_feed(&body) {
        Ok(entries) => {
            tracing::debug!(target: "ingest", source = %source.id, entries = entries.len(), "feed parsed");
            Some(entries)
        }
        Err(e) => {
            tracing::warn!(error = ?e, source = %source.id, "feed parse failed");
            counter!("ingest_source_errors_total", "kind" => "parse").increment(1);
            None
        }
    }
}

/// Fetch every source concurrently, wait for all of them, then normalize and
/// deduplicate in source-declaration order. A failing source contributes
/// nothing and is listed in the report.
pub async fn run_live(
    feeds: Vec<FeedSource>,
    fetcher: &dyn FeedFetcher,
    classifier: &Classifier,
) -> IngestBatch {
    ensure_metrics_described();

    let results = join_all(feeds.iter().map(|f| fetch_source(fetcher, f))).await;

    let mut failed_sources = Vec::new();
    let mut groups = Vec::with_capacity(feeds.len());
    for (source, res) in feeds.iter().zip(results) {
        match res {
            Some(entries) => groups.push((source, entries)),
            None => failed_sources.push(source.id.clone()),
        }
    }

    let (items, mut report) = normalize_groups(groups, classifier);
    report.failed_sources = failed_sources;
    record_run("live", &report);

    IngestBatch {
        generated_at: Some(Utc::now()),
        feeds,
        items,
        report,
    }
}
