// src/favorites.rs
//! Favorites persistence: a set of item ids that outlives ingestion runs.
//!
//! Missing or corrupt data never fails a session; it reads as an empty set.

use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Fixed key under which favorites are stored.
pub const FAVORITES_NAMESPACE: &str = "techwatch_favs_v1";

pub trait FavoritesStore: Send + Sync {
    fn load(&self) -> HashSet<String>;
    fn save(&self, ids: &HashSet<String>) -> Result<()>;
}

/// JSON array of ids in `<dir>/<namespace>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileFavorites {
    path: PathBuf,
}

impl JsonFileFavorites {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(format!("{FAVORITES_NAMESPACE}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesStore for JsonFileFavorites {
    fn load(&self) -> HashSet<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return HashSet::new(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "favorites unreadable, starting empty");
                return HashSet::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(ids) => ids.into_iter().filter(|id| !id.is_empty()).collect(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "favorites corrupt, starting empty");
                HashSet::new()
            }
        }
    }

    fn save(&self, ids: &HashSet<String>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let sorted: BTreeSet<&String> = ids.iter().collect();
        let json = serde_json::to_string(&sorted)?;

        // write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store (tests, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryFavorites {
    inner: Mutex<HashSet<String>>,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl FavoritesStore for MemoryFavorites {
    fn load(&self) -> HashSet<String> {
        self.inner.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn save(&self, ids: &HashSet<String>) -> Result<()> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| anyhow!("favorites mutex poisoned"))?;
        *g = ids.clone();
        Ok(())
    }
}
