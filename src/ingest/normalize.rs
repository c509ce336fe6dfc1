// src/ingest/normalize.rs
use crate::classify::{Classifier, ClassifyInput};
use crate::ingest::date::normalize_date;
use crate::ingest::sanitize::{summarize, SUMMARY_MAX_CHARS};
use crate::ingest::types::{FeedSource, NormalizedItem, RawEntry, Tech};

/// Max number of tags kept per item.
pub const TAGS_MAX: usize = 12;

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

/// Map one raw entry and its owning source into the canonical record.
/// Missing fields degrade to "" / `None` / `Other`; this never fails.
pub fn normalize_item(raw: &RawEntry, source: &FeedSource, classifier: &Classifier) -> NormalizedItem {
    let title = non_empty(raw.title.as_deref()).unwrap_or_default().to_string();
    let url = non_empty(raw.url.as_deref()).unwrap_or_default().to_string();
    let summary = summarize(raw.summary.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS);
    let published_at = normalize_date(raw.published.as_deref());

    let tags: Vec<String> = raw
        .categories
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(TAGS_MAX)
        .map(str::to_string)
        .collect();

    let id = match non_empty(raw.id.as_deref()) {
        Some(id) => id.to_string(),
        None if !url.is_empty() => url.clone(),
        None => format!("{}:{}", source.id, title),
    };

    // Entry-level declaration beats the source default.
    let hint = raw
        .tech
        .filter(Tech::is_declared)
        .unwrap_or(source.default_tech);

    let tech = classifier.classify(&ClassifyInput {
        title: &title,
        summary: &summary,
        tags: &tags,
        declared: hint,
    });

    NormalizedItem {
        id,
        title,
        url,
        summary,
        published_at,
        source_id: source.id.clone(),
        source_name: source.name.clone(),
        tags,
        tech,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(default_tech: Tech) -> FeedSource {
        FeedSource {
            id: "blog".into(),
            name: "Blog".into(),
            url: "https://blog.test/feed".into(),
            default_tech,
        }
    }

    #[test]
    fn id_falls_back_to_url_then_source_and_title() {
        let c = Classifier::default_seed();
        let mut raw = RawEntry {
            title: Some("  Hello  ".into()),
            url: Some("https://blog.test/hello".into()),
            ..Default::default()
        };
        assert_eq!(normalize_item(&raw, &src(Tech::Other), &c).id, "https://blog.test/hello");

        raw.url = None;
        let it = normalize_item(&raw, &src(Tech::Other), &c);
        assert_eq!(it.id, "blog:Hello");
        assert_eq!(it.title, "Hello");
        assert_eq!(it.url, "");

        raw.id = Some("urn:x:1".into());
        assert_eq!(normalize_item(&raw, &src(Tech::Other), &c).id, "urn:x:1");
    }

    #[test]
    fn empty_entry_degrades_to_defaults() {
        let it = normalize_item(&RawEntry::default(), &src(Tech::Other), &Classifier::default());
        assert_eq!(it.id, "blog:");
        assert_eq!(it.summary, "");
        assert_eq!(it.published_at, None);
        assert!(it.tags.is_empty());
        assert_eq!(it.tech, Tech::Other);
        assert_eq!(it.source_name, "Blog");
    }

    #[test]
    fn tags_are_cleaned_and_capped() {
        let mut cats: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        cats.insert(0, "  ".into());
        let raw = RawEntry {
            categories: cats,
            ..Default::default()
        };
        let it = normalize_item(&raw, &src(Tech::Other), &Classifier::default());
        assert_eq!(it.tags.len(), TAGS_MAX);
        assert_eq!(it.tags[0], "t0");
        assert_eq!(it.tags[11], "t11");
    }

    #[test]
    fn source_default_is_a_hint_that_wins() {
        let raw = RawEntry {
            title: Some("Spring Boot and JUnit tips".into()),
            ..Default::default()
        };
        let c = Classifier::default();
        assert_eq!(normalize_item(&raw, &src(Tech::Angular), &c).tech, Tech::Angular);
        assert_eq!(normalize_item(&raw, &src(Tech::Other), &c).tech, Tech::Java);
    }

    #[test]
    fn entry_declaration_beats_source_default() {
        let raw = RawEntry {
            title: Some("Whatever".into()),
            tech: Some(Tech::Java),
            ..Default::default()
        };
        let it = normalize_item(&raw, &src(Tech::Angular), &Classifier::default());
        assert_eq!(it.tech, Tech::Java);
    }
}
