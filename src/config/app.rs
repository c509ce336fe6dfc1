// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/techwatch.toml";
pub const ENV_CONFIG_PATH: &str = "TECHWATCH_CONFIG_PATH";
pub const ENV_BIND: &str = "TECHWATCH_BIND";

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_USER_AGENT: &str = "tech-watch/1.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub fetch: FetchConfig,
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Snapshot entries document.
    pub entries_path: PathBuf,
    /// Source list shipped next to the snapshot.
    pub feeds_path: PathBuf,
    /// Source list read by the batch fetcher.
    pub sources_path: PathBuf,
    pub favorites_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            entries_path: PathBuf::from("data/entries.json"),
            feeds_path: PathBuf::from("data/feeds.json"),
            sources_path: PathBuf::from("feeds.json"),
            favorites_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Optional raw-proxy endpoint; the feed URL goes in its `url` parameter.
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Keyword override file; missing file → built-in tables.
    pub keywords_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords_path: Some(PathBuf::from("config/keywords.toml")),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve config:
    /// 1) $TECHWATCH_CONFIG_PATH (must exist)
    /// 2) config/techwatch.toml
    /// 3) built-in defaults
    ///
    /// $TECHWATCH_BIND then overrides `server.bind`.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };

        if let Ok(bind) = env::var(ENV_BIND) {
            if !bind.trim().is_empty() {
                cfg.server.bind = bind.trim().to_string();
            }
        }
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        if self.fetch.timeout_secs == 0 {
            self.fetch.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.fetch.user_agent.trim().is_empty() {
            self.fetch.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        if self.fetch.proxy.as_deref().is_some_and(|p| p.trim().is_empty()) {
            self.fetch.proxy = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
[fetch]
timeout_secs = 0
proxy = "  "

[server]
bind = "0.0.0.0:9000"
"#,
        )
        .unwrap();
        assert_eq!(cfg.fetch.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.fetch.proxy, None);
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.data.entries_path, PathBuf::from("data/entries.json"));
    }

    #[test]
    fn bad_types_are_errors() {
        assert!(AppConfig::from_toml_str("[fetch]\ntimeout_secs = \"soon\"").is_err());
    }
}
