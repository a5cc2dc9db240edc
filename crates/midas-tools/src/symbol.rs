//! Symbol resolution
//!
//! Maps user phrasing ("삼성전자", "애플", "TSLA", "005930") to a concrete
//! ticker symbol. Plain tickers and 6-digit KRX codes resolve locally;
//! anything else goes through the Yahoo symbol search endpoint, preferring
//! equity quotes and KRX listings for Korean queries.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Known user typos that short-circuit resolution.
const COMMON_FIXES: &[(&str, &str)] = &[("APPL", "AAPL")];

const YAHOO_SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";

fn ticker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i)[A-Z0-9][A-Z0-9.\-]{0,9}$").expect("valid regex"))
}

fn krx_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{6}$").expect("valid regex"))
}

/// Whether the text already looks like a ticker symbol.
#[must_use]
pub fn looks_like_ticker(text: &str) -> bool {
    ticker_re().is_match(text.trim())
}

/// Whether the symbol is a Korean exchange listing.
#[must_use]
pub fn is_krx_symbol(symbol: &str) -> bool {
    let s = symbol.to_uppercase();
    s.ends_with(".KS") || s.ends_with(".KQ") || krx_code_re().is_match(&s)
}

fn has_hangul(text: &str) -> bool {
    text.chars().any(|c| ('\u{ac00}'..='\u{d7a3}').contains(&c))
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Deserialize)]
struct SearchQuote {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(rename = "quoteType", default)]
    quote_type: Option<String>,
}

/// Resolves free-form stock references to ticker symbols.
pub struct SymbolResolver {
    client: reqwest::Client,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver {
    /// Create a resolver with a short-timeout HTTP client.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .user_agent("Mozilla/5.0")
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Resolve a query to a ticker symbol, or `None` if nothing matches.
    pub async fn resolve(&self, query: &str) -> Option<String> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }

        let upper = trimmed.to_uppercase();
        if let Some((_, fixed)) = COMMON_FIXES.iter().find(|(typo, _)| *typo == upper) {
            debug!(query = %trimmed, fixed = %fixed, "Applied common ticker fix");
            return Some((*fixed).to_string());
        }

        // Bare 6-digit codes are KOSPI listings unless proven otherwise.
        if krx_code_re().is_match(&upper) {
            return Some(format!("{upper}.KS"));
        }

        if looks_like_ticker(trimmed) && !has_hangul(trimmed) {
            return Some(upper);
        }

        self.search_yahoo(trimmed).await
    }

    async fn search_yahoo(&self, keyword: &str) -> Option<String> {
        let response = self
            .client
            .get(YAHOO_SEARCH_URL)
            .query(&[
                ("q", keyword),
                ("quotesCount", "6"),
                ("newsCount", "0"),
                ("listsCount", "0"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let data: SearchResponse = match response {
            Ok(r) => match r.json().await {
                Ok(d) => d,
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "Symbol search returned bad payload");
                    return None;
                }
            },
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "Symbol search failed");
                return None;
            }
        };

        let symbols: Vec<(String, String)> = data
            .quotes
            .into_iter()
            .filter_map(|q| {
                q.symbol
                    .map(|s| (s.to_uppercase(), q.quote_type.unwrap_or_default()))
            })
            .collect();

        // Korean queries prefer KRX listings.
        if has_hangul(keyword) {
            if let Some((sym, _)) = symbols
                .iter()
                .find(|(s, _)| s.ends_with(".KS") || s.ends_with(".KQ"))
            {
                return Some(sym.clone());
            }
        }

        // Prefer equities over funds, indices and currencies.
        if let Some((sym, _)) = symbols.iter().find(|(_, t)| t == "EQUITY") {
            return Some(sym.clone());
        }

        symbols.into_iter().next().map(|(s, _)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_ticker() {
        assert!(looks_like_ticker("AAPL"));
        assert!(looks_like_ticker("aapl"));
        assert!(looks_like_ticker("005930.KS"));
        assert!(looks_like_ticker("BRK-B"));
        assert!(!looks_like_ticker("삼성전자"));
        assert!(!looks_like_ticker(""));
    }

    #[test]
    fn test_is_krx_symbol() {
        assert!(is_krx_symbol("005930.KS"));
        assert!(is_krx_symbol("035720.kq"));
        assert!(is_krx_symbol("005930"));
        assert!(!is_krx_symbol("AAPL"));
        assert!(!is_krx_symbol("12345"));
    }

    #[tokio::test]
    async fn test_resolve_local_paths() {
        let resolver = SymbolResolver::new();

        assert_eq!(resolver.resolve("  tsla ").await.as_deref(), Some("TSLA"));
        assert_eq!(
            resolver.resolve("005930").await.as_deref(),
            Some("005930.KS")
        );
        assert_eq!(resolver.resolve("APPL").await.as_deref(), Some("AAPL"));
        assert_eq!(resolver.resolve("").await, None);
    }
}
