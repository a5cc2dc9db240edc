//! Market data client
//!
//! Quote lookups with a short TTL cache so repeated questions inside one
//! conversation do not hammer the upstream APIs. Overseas symbols try
//! TwelveData first (when a key is configured) and fall back to the Yahoo
//! chart endpoint; KRX symbols go straight to Yahoo.

use crate::error::{Error, Result};
use crate::symbol::is_krx_symbol;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const TWELVEDATA_PRICE_URL: &str = "https://api.twelvedata.com/price";
const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Default cache lifetime for quotes.
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    price: f64,
    fetched_at: Instant,
}

/// Quote client with TTL caching.
pub struct PriceClient {
    client: reqwest::Client,
    twelvedata_key: Option<String>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

#[derive(Deserialize)]
struct TwelveDataPrice {
    #[serde(default)]
    price: Option<String>,
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Deserialize, Default)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

#[derive(Deserialize, Default)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize, Default)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl PriceClient {
    /// Create a client with the default TTL, reading the TwelveData key
    /// from `TWELVE_DATA_API_KEY` if present.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("TWELVE_DATA_API_KEY").ok(), DEFAULT_PRICE_TTL)
    }

    /// Create a client with an explicit key and TTL.
    #[must_use]
    pub fn new(twelvedata_key: Option<String>, ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("Mozilla/5.0")
            .build()
            .unwrap_or_default();
        Self {
            client,
            twelvedata_key,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up the current price for a resolved symbol.
    pub async fn price(&self, symbol: &str) -> Result<f64> {
        if let Some(price) = self.cached(symbol).await {
            debug!(symbol = %symbol, price, "Price cache hit");
            return Ok(price);
        }

        let price = if is_krx_symbol(symbol) {
            self.yahoo_chart(symbol).await
        } else {
            match self.twelvedata(symbol).await {
                Some(p) => Some(p),
                None => self.yahoo_chart(symbol).await,
            }
        };

        match price {
            Some(p) => {
                self.store(symbol, p).await;
                Ok(p)
            }
            None => Err(Error::Execution(format!("가격 조회 실패: {symbol}"))),
        }
    }

    /// Format a price in the symbol's native currency.
    #[must_use]
    pub fn format_price(symbol: &str, price: f64) -> String {
        if is_krx_symbol(symbol) {
            format!("{symbol}의 현재 주가는 ₩{price:.2}입니다.")
        } else {
            format!("{symbol}의 현재 주가는 ${price:.4}입니다.")
        }
    }

    async fn cached(&self, symbol: &str) -> Option<f64> {
        let cache = self.cache.read().await;
        cache
            .get(symbol)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.price)
    }

    async fn store(&self, symbol: &str, price: f64) {
        let mut cache = self.cache.write().await;
        cache.insert(
            symbol.to_string(),
            CacheEntry {
                price,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Seed the cache directly. Test hook, also useful for offline demos.
    pub async fn prime(&self, symbol: &str, price: f64) {
        self.store(symbol, price).await;
    }

    async fn twelvedata(&self, symbol: &str) -> Option<f64> {
        let key = self.twelvedata_key.as_deref()?;
        let response = self
            .client
            .get(TWELVEDATA_PRICE_URL)
            .query(&[("symbol", symbol), ("apikey", key)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match response {
            Ok(r) => r
                .json::<TwelveDataPrice>()
                .await
                .ok()
                .and_then(|p| p.price)
                .and_then(|s| s.parse::<f64>().ok()),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "TwelveData lookup failed");
                None
            }
        }
    }

    async fn yahoo_chart(&self, symbol: &str) -> Option<f64> {
        let url = format!("{YAHOO_CHART_URL}/{symbol}");
        let response = self
            .client
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1m")])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let data: ChartResponse = match response {
            Ok(r) => match r.json().await {
                Ok(d) => d,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Yahoo chart returned bad payload");
                    return None;
                }
            },
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Yahoo chart lookup failed");
                return None;
            }
        };

        let result = data.chart.result.into_iter().next()?;

        if let Some(p) = result.meta.regular_market_price.filter(|p| !p.is_nan()) {
            return Some(p);
        }

        // Fall back to the last non-null close of the day.
        result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close.into_iter().flatten().next_back())
    }
}
