// src/query.rs
//! Filter/query engine over the deduplicated collection.
//!
//! Predicates, in order: favorites-only, topic, source, recency, free text.
//! Survivors are sorted newest first (unknown dates last), ties broken by `id`
//! then `url` so the order never depends on sort stability.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::ingest::types::{NormalizedItem, Tech};

pub const ALL: &str = "ALL";
pub const RECENT_WINDOW_DAYS: f64 = 7.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// `ALL` or one concrete value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Selection<T> {
    pub fn as_only(&self) -> Option<&T> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub query: String,
    pub tech: Selection<Tech>,
    pub source_id: Selection<String>,
    /// Days, fractional allowed.
    pub max_age_days: Selection<f64>,
    pub favorites_only: bool,
}

/// Wire form of `FilterState` (query string / JSON body).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub tech: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// `"ALL"`, a number, or a numeric string.
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub fav: Option<bool>,
}

impl TryFrom<FilterParams> for FilterState {
    type Error = anyhow::Error;

    fn try_from(p: FilterParams) -> Result<Self> {
        let tech = match p.tech.as_deref().map(str::trim) {
            None | Some("") | Some(ALL) => Selection::All,
            Some(t) => match t.to_ascii_lowercase().as_str() {
                "angular" => Selection::Only(Tech::Angular),
                "java" => Selection::Only(Tech::Java),
                "other" => Selection::Only(Tech::Other),
                _ => bail!("unknown tech filter `{t}`"),
            },
        };

        let source_id = match p.source.as_deref().map(str::trim) {
            None | Some("") | Some(ALL) => Selection::All,
            Some(s) => Selection::Only(s.to_string()),
        };

        let max_age_days = match p.age {
            None | Some(Value::Null) => Selection::All,
            Some(Value::String(s)) if s.trim().is_empty() || s.trim() == ALL => Selection::All,
            Some(Value::String(s)) => Selection::Only(parse_days(
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| anyhow!("invalid age filter `{s}`"))?,
            )?),
            Some(Value::Number(n)) => Selection::Only(parse_days(
                n.as_f64().ok_or_else(|| anyhow!("invalid age filter `{n}`"))?,
            )?),
            Some(other) => bail!("invalid age filter `{other}`"),
        };

        Ok(FilterState {
            query: p.q.unwrap_or_default(),
            tech,
            source_id,
            max_age_days,
            favorites_only: p.fav.unwrap_or(false),
        })
    }
}

fn parse_days(d: f64) -> Result<f64> {
    if !d.is_finite() || d < 0.0 {
        bail!("age filter must be a non-negative number of days, got {d}");
    }
    Ok(d)
}

impl From<&FilterState> for FilterParams {
    fn from(f: &FilterState) -> Self {
        FilterParams {
            q: Some(f.query.clone()),
            tech: Some(
                f.tech
                    .as_only()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| ALL.to_string()),
            ),
            source: Some(f.source_id.as_only().cloned().unwrap_or_else(|| ALL.to_string())),
            age: Some(match f.max_age_days {
                Selection::All => Value::from(ALL),
                Selection::Only(d) => Value::from(d),
            }),
            fav: Some(f.favorites_only),
        }
    }
}

/// Aggregate counts over the unfiltered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub angular: usize,
    pub java: usize,
    pub other: usize,
    /// Published within the last `RECENT_WINDOW_DAYS`.
    pub recent7: usize,
}

/// Elapsed fractional days; unknown dates are infinitely old.
pub fn days_since(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match ts {
        Some(t) => (now - t).num_milliseconds() as f64 / MS_PER_DAY,
        None => f64::INFINITY,
    }
}

pub fn compute_stats_at(collection: &[NormalizedItem], now: DateTime<Utc>) -> Stats {
    let mut s = Stats {
        total: collection.len(),
        ..Stats::default()
    };
    for it in collection {
        match it.tech {
            Tech::Angular => s.angular += 1,
            Tech::Java => s.java += 1,
            Tech::Other => s.other += 1,
        }
        if days_since(it.published_at, now) <= RECENT_WINDOW_DAYS {
            s.recent7 += 1;
        }
    }
    s
}

pub fn compute_stats(collection: &[NormalizedItem]) -> Stats {
    compute_stats_at(collection, Utc::now())
}

fn search_haystack(it: &NormalizedItem) -> String {
    format!(
        "{} {} {} {}",
        it.title,
        it.summary,
        it.source_name,
        it.tags.join(" ")
    )
    .to_lowercase()
}

fn keep(
    it: &NormalizedItem,
    f: &FilterState,
    favorites: &HashSet<String>,
    needle: &str,
    now: DateTime<Utc>,
) -> bool {
    if f.favorites_only && !favorites.contains(&it.id) {
        return false;
    }
    if f.tech.as_only().is_some_and(|t| *t != it.tech) {
        return false;
    }
    if f.source_id.as_only().is_some_and(|s| *s != it.source_id) {
        return false;
    }
    if f
        .max_age_days
        .as_only()
        .is_some_and(|max| days_since(it.published_at, now) > *max)
    {
        return false;
    }
    needle.is_empty() || search_haystack(it).contains(needle)
}

/// Newest first, unknown dates last, then `id`, then `url`.
pub fn sort_newest_first(items: &mut [NormalizedItem]) {
    items.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.url.cmp(&b.url))
    });
}

/// Filter and sort as of `now`.
pub fn query_at(
    collection: &[NormalizedItem],
    filters: &FilterState,
    favorites: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<NormalizedItem> {
    let needle = filters.query.trim().to_lowercase();
    let mut out: Vec<NormalizedItem> = collection
        .iter()
        .filter(|it| keep(it, filters, favorites, &needle, now))
        .cloned()
        .collect();
    sort_newest_first(&mut out);
    out
}

pub fn query(
    collection: &[NormalizedItem],
    filters: &FilterState,
    favorites: &HashSet<String>,
) -> Vec<NormalizedItem> {
    query_at(collection, filters, favorites, Utc::now())
}
