// src/ingest/snapshot.rs
//! Snapshot documents: `{ generatedAt, items[] }` plus a sibling `FeedSource[]`.
//!
//! Snapshot entries are loosely shaped (field names vary with whoever wrote
//! them), so each entry is kept as a JSON value and mapped to `RawEntry` by
//! picking the first non-empty of the known aliases.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::ingest::date::{normalize_date, to_canonical};
use crate::ingest::types::{FeedSource, NormalizedItem, RawEntry, Tech};

const ID_KEYS: [&str; 3] = ["id", "guid", "uid"];
const URL_KEYS: [&str; 2] = ["url", "link"];
const SUMMARY_KEYS: [&str; 3] = ["summary", "contentSnippet", "content"];
const DATE_KEYS: [&str; 4] = ["publishedAt", "isoDate", "pubDate", "date"];
const TAG_KEYS: [&str; 2] = ["tags", "categories"];
const TECH_KEYS: [&str; 2] = ["tech", "defaultTech"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDoc {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub items: Vec<SnapshotEntry>,
}

impl SnapshotDoc {
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        normalize_date(self.generated_at.as_deref())
    }
}

/// One loosely-typed snapshot entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SnapshotEntry(pub Value);

impl SnapshotEntry {
    fn field(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|m| m.get(key))
    }

    fn pick(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.field(k).and_then(scalar_to_string))
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
    }

    /// First key holding an array; scalars coerced to strings, nulls dropped.
    fn list(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .find_map(|k| self.field(k).and_then(Value::as_array))
            .map(|arr| arr.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default()
    }

    pub fn to_raw(&self) -> RawEntry {
        RawEntry {
            id: self.pick(&ID_KEYS),
            title: self.pick(&["title"]),
            url: self.pick(&URL_KEYS),
            summary: self.pick(&SUMMARY_KEYS),
            published: self.pick(&DATE_KEYS),
            categories: self.list(&TAG_KEYS),
            tech: self.pick(&TECH_KEYS).map(|t| Tech::from_label(&t)),
            source_id: self.pick(&["sourceId"]),
            source_name: self.pick(&["sourceName"]),
        }
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Read a `FeedSource[]` document.
pub fn load_sources(path: &Path) -> Result<Vec<FeedSource>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source list from {}", path.display()))?;
    let feeds: Vec<FeedSource> = serde_json::from_str(&content)
        .with_context(|| format!("parsing source list from {}", path.display()))?;
    Ok(feeds)
}

/// Read the entries document and its source list. Both must succeed.
pub fn load_snapshot(entries_path: &Path, feeds_path: &Path) -> Result<(SnapshotDoc, Vec<FeedSource>)> {
    let feeds = load_sources(feeds_path)?;
    let content = fs::read_to_string(entries_path)
        .with_context(|| format!("reading snapshot from {}", entries_path.display()))?;
    let doc: SnapshotDoc = serde_json::from_str(&content)
        .with_context(|| format!("parsing snapshot from {}", entries_path.display()))?;
    Ok((doc, feeds))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut {
    generated_at: Option<String>,
    items: Vec<NormalizedItem>,
}

/// Write the entries document and the source list (pretty JSON).
/// `items` are written as given; callers sort them first.
///
/// Summaries are plain text in memory but an HTML fragment on disk (entries
/// are sanitized again on load), so they are written HTML-escaped.
pub fn write_snapshot(
    entries_path: &Path,
    feeds_path: &Path,
    generated_at: Option<DateTime<Utc>>,
    items: &[NormalizedItem],
    feeds: &[FeedSource],
) -> Result<()> {
    let doc = SnapshotOut {
        generated_at: generated_at.as_ref().map(to_canonical),
        items: items
            .iter()
            .map(|it| NormalizedItem {
                summary: html_escape::encode_text(&it.summary).into_owned(),
                ..it.clone()
            })
            .collect(),
    };
    write_json(entries_path, &doc)?;
    write_json(feeds_path, &feeds)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
