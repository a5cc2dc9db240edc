//! Portfolio storage
//!
//! Holdings are keyed by symbol with a quantity and blended average
//! purchase price. Order execution is a read-modify-write, so writers for
//! the same symbol must hold that symbol's lock for the whole sequence.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A single holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Ticker symbol
    pub symbol: String,
    /// Shares held
    pub quantity: i64,
    /// Blended average purchase price
    pub purchase_price: f64,
    /// Last update timestamp
    pub created_at: DateTime<Utc>,
}

/// Storage backend for portfolio positions.
#[async_trait::async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Get the position for a symbol, if held.
    async fn get(&self, symbol: &str) -> Result<Option<Position>>;

    /// Insert or replace a position.
    async fn upsert(&self, position: &Position) -> Result<()>;

    /// Delete a position. Returns whether anything was removed.
    async fn delete(&self, symbol: &str) -> Result<bool>;

    /// List all positions.
    async fn list(&self) -> Result<Vec<Position>>;
}

/// Per-symbol mutual exclusion for order execution.
///
/// Guards the get → compute → upsert sequence so that two concurrent
/// orders for the same symbol cannot both read the old quantity.
#[derive(Default)]
pub struct SymbolLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SymbolLocks {
    /// Create an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a symbol, creating it on first use.
    pub async fn acquire(&self, symbol: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(symbol.to_uppercase())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// In-memory portfolio store.
#[derive(Default)]
pub struct MemoryPortfolioStore {
    positions: RwLock<HashMap<String, Position>>,
}

impl MemoryPortfolioStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PortfolioStore for MemoryPortfolioStore {
    async fn get(&self, symbol: &str) -> Result<Option<Position>> {
        let positions = self.positions.read().await;
        Ok(positions.get(symbol).cloned())
    }

    async fn upsert(&self, position: &Position) -> Result<()> {
        let mut positions = self.positions.write().await;
        positions.insert(position.symbol.clone(), position.clone());
        Ok(())
    }

    async fn delete(&self, symbol: &str) -> Result<bool> {
        let mut positions = self.positions.write().await;
        Ok(positions.remove(symbol).is_some())
    }

    async fn list(&self) -> Result<Vec<Position>> {
        let positions = self.positions.read().await;
        let mut all: Vec<Position> = positions.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(all)
    }
}

/// REST-backed portfolio store (PostgREST/Supabase wire shape).
///
/// Rows live in a `portfolio` table addressed by `?symbol=eq.{symbol}`.
pub struct RestPortfolioStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestPortfolioStore {
    /// Create a store against the given REST base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Create from `PORTFOLIO_API_URL` and `PORTFOLIO_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("PORTFOLIO_API_URL")
            .map_err(|_| Error::Execution("PORTFOLIO_API_URL not set".to_string()))?;
        let api_key = std::env::var("PORTFOLIO_API_KEY")
            .map_err(|_| Error::Execution("PORTFOLIO_API_KEY not set".to_string()))?;
        Ok(Self::new(base_url, api_key))
    }

    fn row_url(&self, symbol: &str) -> String {
        format!("{}/rest/v1/portfolio?symbol=eq.{}", self.base_url, symbol)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/portfolio", self.base_url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait::async_trait]
impl PortfolioStore for RestPortfolioStore {
    async fn get(&self, symbol: &str) -> Result<Option<Position>> {
        let response = self
            .authed(self.client.get(self.row_url(symbol)))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Network(e.to_string()))?;

        let rows: Vec<Position> = response
            .json()
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, position: &Position) -> Result<()> {
        // PATCH the existing row; POST a new one when nothing matched.
        let patched = self
            .authed(self.client.patch(self.row_url(&position.symbol)))
            .header("Prefer", "return=representation")
            .json(position)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Network(e.to_string()))?;

        let rows: Vec<serde_json::Value> = patched
            .json()
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        if !rows.is_empty() {
            debug!(symbol = %position.symbol, "Updated portfolio row");
            return Ok(());
        }

        self.authed(self.client.post(self.table_url()))
            .json(position)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(symbol = %position.symbol, error = %e, "Portfolio insert failed");
                Error::Network(e.to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, symbol: &str) -> Result<bool> {
        self.authed(self.client.delete(self.row_url(symbol)))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Position>> {
        let response = self
            .authed(self.client.get(self.table_url()))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Network(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| Error::Execution(e.to_string()))
    }
}
