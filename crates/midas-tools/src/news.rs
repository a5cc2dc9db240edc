//! Market news client
//!
//! Pulls recent US market headlines from the Marketaux news API for the
//! briefing tool. Without an API key every lookup fails, which callers
//! fold into their output rather than propagate.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

const MARKETAUX_NEWS_URL: &str = "https://api.marketaux.com/v1/news/all";

/// Default number of headlines per briefing.
pub const DEFAULT_HEADLINE_LIMIT: usize = 5;

/// One news item: title plus a short summary.
#[derive(Debug, Clone, Deserialize)]
pub struct Headline {
    /// Article title.
    #[serde(default)]
    pub title: String,
    /// Article summary.
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    data: Vec<Headline>,
}

/// Marketaux headline client.
pub struct NewsClient {
    client: reqwest::Client,
    api_key: Option<String>,
    primed: RwLock<Option<Vec<Headline>>>,
}

impl NewsClient {
    /// Create a client reading the key from `MARKETAUX_API_KEY` if present.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("MARKETAUX_API_KEY").ok())
    }

    /// Create a client with an explicit key.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            primed: RwLock::new(None),
        }
    }

    /// Fetch the latest US market headlines, newest first.
    pub async fn headlines(&self, limit: usize) -> Result<Vec<Headline>> {
        if let Some(primed) = self.primed.read().await.as_ref() {
            return Ok(primed.iter().take(limit).cloned().collect());
        }

        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Execution("뉴스 API 키가 설정되지 않았습니다".to_string()))?;

        let response = self
            .client
            .get(MARKETAUX_NEWS_URL)
            .query(&[
                ("api_token", key),
                ("language", "en"),
                ("countries", "us"),
                ("filter_entities", "true"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(error = %e, "Marketaux lookup failed");
                Error::Network(format!("뉴스 조회 실패: {e}"))
            })?;

        let news: NewsResponse = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("뉴스 응답 파싱 실패: {e}")))?;

        Ok(news.data.into_iter().take(limit).collect())
    }

    /// Seed fixed headlines. Test hook, also useful for offline demos.
    pub async fn prime(&self, headlines: Vec<Headline>) {
        *self.primed.write().await = Some(headlines);
    }
}

impl Headline {
    /// Render as a prompt block.
    #[must_use]
    pub fn render(&self) -> String {
        format!("Title: {}\nSummary: {}", self.title, self.description)
    }
}
