// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Topic label assigned to every item. Never absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Tech {
    Angular,
    Java,
    #[default]
    Other,
}

impl Tech {
    /// Lenient label parsing: case-insensitive, legacy "Autre" and anything
    /// unknown fall back to `Other`.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim();
        if l.eq_ignore_ascii_case("angular") {
            Tech::Angular
        } else if l.eq_ignore_ascii_case("java") {
            Tech::Java
        } else {
            Tech::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tech::Angular => "Angular",
            Tech::Java => "Java",
            Tech::Other => "Other",
        }
    }

    pub fn is_declared(&self) -> bool {
        !matches!(self, Tech::Other)
    }
}

impl fmt::Display for Tech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tech {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().map(Tech::from_label).unwrap_or_default())
    }
}

/// A configured feed. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub default_tech: Tech,
}

impl FeedSource {
    /// Descriptor for entries whose owning source is not in the source list.
    pub fn synthesized(id: Option<&str>, name: Option<&str>) -> Self {
        let id = id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string();
        let name = name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        Self {
            id,
            name,
            url: String::new(),
            default_tech: Tech::Other,
        }
    }
}

/// Dialect-neutral entry produced by the RSS, Atom and snapshot extractors.
/// Every field is optional; the normalizer owns the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub categories: Vec<String>,
    /// Topic declared on the entry itself (snapshot entries only).
    pub tech: Option<Tech>,
    /// Provenance carried by snapshot entries.
    pub source_id: Option<String>,
    pub source_name: Option<String>,
}

/// Canonical record held in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    #[serde(default, with = "crate::ingest::date::canonical_opt")]
    pub published_at: Option<DateTime<Utc>>,
    pub source_id: String,
    pub source_name: String,
    pub tags: Vec<String>,
    pub tech: Tech,
}

impl NormalizedItem {
    /// Dedup key: `id`, falling back to `url`. `None` when both are empty.
    pub fn dedup_key(&self) -> Option<&str> {
        if !self.id.is_empty() {
            Some(&self.id)
        } else if !self.url.is_empty() {
            Some(&self.url)
        } else {
            None
        }
    }
}

/// HTTP-capable collaborator returning raw feed markup for one source.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<String>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tech_labels_are_lenient() {
        assert_eq!(Tech::from_label("angular"), Tech::Angular);
        assert_eq!(Tech::from_label(" JAVA "), Tech::Java);
        assert_eq!(Tech::from_label("Autre"), Tech::Other);
        assert_eq!(Tech::from_label("kotlin"), Tech::Other);
    }

    #[test]
    fn feed_source_default_tech_is_optional() {
        let s: FeedSource =
            serde_json::from_str(r#"{"id":"a","name":"A","url":"https://a.test/rss"}"#).unwrap();
        assert_eq!(s.default_tech, Tech::Other);
        let s: FeedSource =
            serde_json::from_str(r#"{"id":"b","name":"B","url":"","defaultTech":null}"#).unwrap();
        assert_eq!(s.default_tech, Tech::Other);
    }

    #[test]
    fn dedup_key_falls_back_to_url() {
        let mut it = NormalizedItem {
            id: String::new(),
            title: "t".into(),
            url: "https://x.test/1".into(),
            summary: String::new(),
            published_at: None,
            source_id: "s".into(),
            source_name: "S".into(),
            tags: vec![],
            tech: Tech::Other,
        };
        assert_eq!(it.dedup_key(), Some("https://x.test/1"));
        it.url.clear();
        assert_eq!(it.dedup_key(), None);
    }
}
