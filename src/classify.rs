// src/classify.rs
//! Topic classifier: bounded keyword-frequency heuristic over title, summary
//! and tags.
//!
//! - A declared topic (anything but `Other`) wins outright, no scoring.
//! - Otherwise each topic scores the number of its *distinct* keywords found as
//!   substrings of the lower-cased haystack (repetition does not count).
//! - Zero on both sides → `Other`; strictly higher score wins; ties go to the
//!   topic listed first in `TIE_BREAK_ORDER` (Angular, then Java).
//!
//! Keyword tables come from `default_seed()` or a TOML override:
//!
//! ```toml
//! [keywords]
//! angular = ["angular", "rxjs"]
//! java = ["java", "spring boot"]
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::ingest::types::Tech;

/// Fixed priority used when both topics score the same non-zero value.
pub const TIE_BREAK_ORDER: [Tech; 2] = [Tech::Angular, Tech::Java];

/// What the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub tags: &'a [String],
    pub declared: Tech,
}

/// Per-topic keyword hits (diagnostics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicScores {
    pub angular: usize,
    pub java: usize,
}

impl TopicScores {
    pub fn get(&self, tech: Tech) -> usize {
        match tech {
            Tech::Angular => self.angular,
            Tech::Java => self.java,
            Tech::Other => 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct KeywordsRoot {
    keywords: KeywordTables,
}

#[derive(Debug, Clone, Deserialize)]
struct KeywordTables {
    #[serde(default)]
    angular: Vec<String>,
    #[serde(default)]
    java: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    angular: Vec<String>,
    java: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl Classifier {
    /// Built-in keyword tables.
    pub fn default_seed() -> Self {
        let angular = [
            "angular",
            "signals",
            "rxjs",
            "standalone",
            "zone",
            "zoneless",
            "angular material",
            "cdk",
            "ngrx",
            "esbuild",
            "vite",
            "hydration",
            "ssr",
        ];
        let java = [
            "java",
            "jdk",
            "openjdk",
            "spring",
            "spring boot",
            "hibernate",
            "jpa",
            "maven",
            "gradle",
            "junit",
            "testcontainers",
            "micrometer",
            "tomcat",
        ];
        Self {
            angular: clean_list(angular.iter().map(|s| s.to_string())),
            java: clean_list(java.iter().map(|s| s.to_string())),
        }
    }

    /// Parse a `[keywords]` TOML document.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let root: KeywordsRoot = toml::from_str(s)?;
        Ok(Self {
            angular: clean_list(root.keywords.angular),
            java: clean_list(root.keywords.java),
        })
    }

    /// Load an override file; no path or a missing file means the seed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default_seed());
        };
        if !path.exists() {
            info!(path = %path.display(), "keyword file not found, using built-in tables");
            return Ok(Self::default_seed());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keywords from {}", path.display()))?;
        let c = Self::from_toml_str(&content)
            .with_context(|| format!("parsing keywords from {}", path.display()))?;
        info!(
            path = %path.display(),
            angular = c.angular.len(),
            java = c.java.len(),
            "keyword tables loaded"
        );
        Ok(c)
    }

    pub fn keywords(&self, tech: Tech) -> &[String] {
        match tech {
            Tech::Angular => &self.angular,
            Tech::Java => &self.java,
            Tech::Other => &[],
        }
    }

    pub fn score(&self, input: &ClassifyInput<'_>) -> TopicScores {
        let hay = haystack(input);
        let hits = |kws: &[String]| kws.iter().filter(|k| hay.contains(k.as_str())).count();
        TopicScores {
            angular: hits(&self.angular),
            java: hits(&self.java),
        }
    }

    pub fn classify(&self, input: &ClassifyInput<'_>) -> Tech {
        if input.declared.is_declared() {
            return input.declared;
        }

        let scores = self.score(input);
        let mut best = Tech::Other;
        let mut best_score = 0usize;
        for tech in TIE_BREAK_ORDER {
            let s = scores.get(tech);
            if s > best_score {
                best = tech;
                best_score = s;
            }
        }
        best
    }
}

fn haystack(input: &ClassifyInput<'_>) -> String {
    format!(
        "{} {} {}",
        input.title,
        input.summary,
        input.tags.join(" ")
    )
    .to_lowercase()
}

fn clean_list<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(title: &'a str, summary: &'a str, tags: &'a [String]) -> ClassifyInput<'a> {
        ClassifyInput {
            title,
            summary,
            tags,
            declared: Tech::Other,
        }
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let c = Classifier::default_seed();
        let s = c.score(&input("java java java", "", &[]));
        assert_eq!(s.java, 1);
        assert_eq!(s.angular, 0);
    }

    #[test]
    fn overlapping_keywords_each_count() {
        let c = Classifier::default_seed();
        // "spring boot" contains "spring" as well
        let s = c.score(&input("Spring Boot 3.3", "", &[]));
        assert_eq!(s.java, 2);
    }

    #[test]
    fn tags_take_part_in_scoring() {
        let c = Classifier::default_seed();
        let tags = vec!["NgRx".to_string(), "RxJS".to_string()];
        assert_eq!(c.classify(&input("State management", "", &tags)), Tech::Angular);
    }

    #[test]
    fn toml_override_is_cleaned() {
        let c = Classifier::from_toml_str(
            r#"
[keywords]
angular = [" Angular ", "", "angular", "Signals"]
java = ["Quarkus"]
"#,
        )
        .unwrap();
        assert_eq!(c.keywords(Tech::Angular), ["angular", "signals"]);
        assert_eq!(c.keywords(Tech::Java), ["quarkus"]);
        assert_eq!(c.classify(&input("Quarkus native", "", &[])), Tech::Java);
    }

    #[test]
    fn missing_override_file_uses_seed() {
        let c = Classifier::load(Some(Path::new("does/not/exist.toml"))).unwrap();
        assert_eq!(c, Classifier::default_seed());
    }

    #[test]
    fn malformed_override_is_an_error() {
        assert!(Classifier::from_toml_str("keywords = 3").is_err());
    }
}
