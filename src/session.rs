// src/session.rs
//! Session state behind the rendering boundary.
//!
//! A session owns the current collection and everything derived from it. An
//! ingestion run replaces the collection wholesale; a failed run leaves it as
//! it was. The favorites set is the only state that survives across runs and
//! is persisted before any view that depends on it is recomputed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::classify::Classifier;
use crate::favorites::FavoritesStore;
use crate::ingest::types::{FeedFetcher, FeedSource, NormalizedItem};
use crate::ingest::{self, IngestBatch, IngestReport};
use crate::query::{compute_stats, query, FilterState, Stats};

pub struct Session {
    classifier: Arc<Classifier>,
    store: Box<dyn FavoritesStore>,
    feeds: Vec<FeedSource>,
    items: Vec<NormalizedItem>,
    generated_at: Option<DateTime<Utc>>,
    stats: Stats,
    filters: FilterState,
    favorites: HashSet<String>,
    view: Vec<NormalizedItem>,
}

impl Session {
    /// Empty session; favorites are read from `store` right away.
    pub fn new(classifier: Arc<Classifier>, store: Box<dyn FavoritesStore>) -> Self {
        let favorites = store.load();
        Self {
            classifier,
            store,
            feeds: Vec::new(),
            items: Vec::new(),
            generated_at: None,
            stats: Stats::default(),
            filters: FilterState::default(),
            favorites,
            view: Vec::new(),
        }
    }

    pub fn classifier(&self) -> Arc<Classifier> {
        Arc::clone(&self.classifier)
    }

    /// Replace the collection, sources and stats with a new batch.
    pub fn apply_batch(&mut self, batch: IngestBatch) -> IngestReport {
        self.feeds = batch.feeds;
        self.items = batch.items;
        self.generated_at = batch.generated_at;
        self.stats = compute_stats(&self.items);
        self.refresh_view();
        batch.report
    }

    /// Load snapshot documents and apply them. On error nothing changes.
    pub fn load_snapshot(&mut self, entries_path: &Path, feeds_path: &Path) -> Result<IngestReport> {
        let batch = ingest::load_snapshot_batch(entries_path, feeds_path, &self.classifier)?;
        Ok(self.apply_batch(batch))
    }

    /// Live ingestion over the current source list.
    pub async fn ingest_live(&mut self, fetcher: &dyn FeedFetcher) -> IngestReport {
        let batch = ingest::run_live(self.feeds.clone(), fetcher, &self.classifier).await;
        self.apply_batch(batch)
    }

    pub fn set_filters(&mut self, filters: FilterState) -> &[NormalizedItem] {
        self.filters = filters;
        self.refresh_view();
        &self.view
    }

    /// Flip an id in the favorites set. The new set is saved first; if saving
    /// fails the set is restored and the view is left untouched.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        let now_favorite = if self.favorites.remove(id) {
            false
        } else {
            self.favorites.insert(id.to_string());
            true
        };

        if let Err(e) = self.store.save(&self.favorites) {
            if now_favorite {
                self.favorites.remove(id);
            } else {
                self.favorites.insert(id.to_string());
            }
            return Err(e);
        }

        info!(target: "favorites", id, favorite = now_favorite, "favorite toggled");
        self.refresh_view();
        Ok(now_favorite)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn favorites(&self) -> &HashSet<String> {
        &self.favorites
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn view(&self) -> &[NormalizedItem] {
        &self.view
    }

    pub fn collection(&self) -> &[NormalizedItem] {
        &self.items
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.feeds
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    fn refresh_view(&mut self) {
        self.view = query(&self.items, &self.filters, &self.favorites);
    }
}
