// src/ingest/fetch.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::ingest::types::{FeedFetcher, FeedSource};

/// Plain HTTP fetcher, optionally routed through a "raw proxy" endpoint that
/// takes the target as its `url` query parameter.
pub struct HttpFeedFetcher {
    client: Client,
    proxy: Option<Url>,
}

impl HttpFeedFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building http client")?;
        let proxy = cfg
            .proxy
            .as_deref()
            .map(|p| Url::parse(p).with_context(|| format!("invalid proxy url `{p}`")))
            .transpose()?;
        Ok(Self { client, proxy })
    }

    fn target(&self, feed_url: &str) -> Result<Url> {
        match &self.proxy {
            Some(proxy) => {
                let mut u = proxy.clone();
                u.query_pairs_mut().append_pair("url", feed_url);
                Ok(u)
            }
            None => Url::parse(feed_url).with_context(|| format!("invalid feed url `{feed_url}`")),
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        let url = self.target(&source.url)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET feed `{}`", source.id))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("feed `{}` answered HTTP {}", source.id, status));
        }
        resp.text()
            .await
            .with_context(|| format!("reading body of feed `{}`", source.id))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
