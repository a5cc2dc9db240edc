//! Market briefing tool
//!
//! Collects watchlist quotes and recent market headlines, then asks the
//! model for a short daily briefing. The watchlist is configurable per
//! deployment; headlines come from the Marketaux feed.

use crate::error::Result;
use crate::market::PriceClient;
use crate::news::{NewsClient, DEFAULT_HEADLINE_LIMIT};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use midas_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

const BRIEFING_SYSTEM_PROMPT: &str = "당신은 아침 시장 브리핑을 작성하는 어시스턴트입니다. \
제공된 시세와 뉴스 헤드라인을 바탕으로 [시장 요약], [주요 종목], [관전 포인트] 세 섹션의 \
간결한 한국어 브리핑을 작성하세요. 제공된 내용만 사용하고 추측하지 마세요.";

const NEWS_UNAVAILABLE_NOTICE: &str = "(뉴스 조회에 실패하여 시세만 반영합니다)";

/// Default watchlist: KOSPI, S&P 500, Nasdaq Composite.
pub const DEFAULT_WATCHLIST: &[&str] = &["^KS11", "^GSPC", "^IXIC"];

/// Generates a short market briefing over a watchlist and recent headlines.
pub struct MarketBriefingTool {
    definition: ToolDefinition,
    provider: Arc<dyn LlmProvider>,
    prices: Arc<PriceClient>,
    news: Arc<NewsClient>,
    watchlist: Vec<String>,
}

impl MarketBriefingTool {
    /// Create the tool with the default watchlist.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prices: Arc<PriceClient>,
        news: Arc<NewsClient>,
    ) -> Self {
        Self::with_watchlist(
            provider,
            prices,
            news,
            DEFAULT_WATCHLIST.iter().map(|s| (*s).to_string()).collect(),
        )
    }

    /// Create the tool with a custom watchlist.
    #[must_use]
    pub fn with_watchlist(
        provider: Arc<dyn LlmProvider>,
        prices: Arc<PriceClient>,
        news: Arc<NewsClient>,
        watchlist: Vec<String>,
    ) -> Self {
        let definition = ToolDefinition::new(
            "generate_market_briefing",
            "주요 지수와 관심 종목 시세를 모아 오늘의 시장 브리핑을 생성합니다.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "symbols": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "브리핑에 포함할 심볼 목록 (생략 시 기본 관심 목록)"
                }
            },
            "required": []
        }));
        Self {
            definition,
            provider,
            prices,
            news,
            watchlist,
        }
    }
}

#[async_trait::async_trait]
impl Tool for MarketBriefingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let symbols: Vec<String> = input
            .get("symbols")
            .and_then(serde_json::Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or_else(|| self.watchlist.clone());

        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            match self.prices.price(symbol).await {
                Ok(price) => quotes.push(format!("- {symbol}: {price:.2}")),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Briefing quote lookup failed");
                    quotes.push(format!("- {symbol}: 시세 조회 실패"));
                }
            }
        }

        let headlines = match self.news.headlines(DEFAULT_HEADLINE_LIMIT).await {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => {
                warn!("Briefing headline feed returned no articles");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Briefing headline fetch failed");
                Vec::new()
            }
        };
        let headline_count = headlines.len();
        let news_block = if headlines.is_empty() {
            NEWS_UNAVAILABLE_NOTICE.to_string()
        } else {
            headlines
                .iter()
                .map(crate::news::Headline::render)
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let request = CompletionRequest::new(self.provider.default_model())
            .with_message(Message::system(BRIEFING_SYSTEM_PROMPT))
            .with_message(Message::user(format!(
                "오늘의 시세:\n{}\n\n주요 뉴스:\n{}\n\n브리핑을 작성해 주세요.",
                quotes.join("\n"),
                news_block
            )))
            .with_max_tokens(800)
            .with_temperature(0.5);

        match self.provider.complete(request).await {
            Ok(response) => Ok(ToolResult::success(
                serde_json::json!({
                    "symbols": symbols,
                    "headline_count": headline_count,
                    "briefing": response.content,
                }),
                start.elapsed().as_millis() as u64,
            )),
            Err(e) => Ok(ToolResult::failure(
                format!("❌ 브리핑 생성에 실패했습니다: {e}"),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::DEFAULT_PRICE_TTL;
    use crate::news::Headline;
    use midas_llm::MockProvider;

    fn headline(title: &str) -> Headline {
        Headline {
            title: title.to_string(),
            description: "summary".to_string(),
        }
    }

    #[tokio::test]
    async fn test_briefing_with_custom_symbols_and_headlines() {
        let mock = Arc::new(MockProvider::new());
        mock.add_text_response("[시장 요약] 혼조세\n[주요 종목] AAPL\n[관전 포인트] 금리");
        let provider: Arc<dyn LlmProvider> = mock;

        let prices = Arc::new(PriceClient::new(None, DEFAULT_PRICE_TTL));
        prices.prime("AAPL", 231.5).await;
        let news = Arc::new(NewsClient::new(None));
        news.prime(vec![headline("Fed holds rates"), headline("Tech rallies")])
            .await;

        let tool = MarketBriefingTool::new(provider, prices, news);
        let result = tool
            .execute(serde_json::json!({"symbols": ["AAPL"]}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output["symbols"][0], "AAPL");
        assert_eq!(result.output["headline_count"], 2);
        assert!(result.output["briefing"]
            .as_str()
            .unwrap()
            .contains("[시장 요약]"));
    }

    #[tokio::test]
    async fn test_briefing_survives_headline_fetch_failure() {
        let mock = Arc::new(MockProvider::new());
        mock.add_text_response("[시장 요약] 시세 기준 브리핑");
        let provider: Arc<dyn LlmProvider> = mock;

        let prices = Arc::new(PriceClient::new(None, DEFAULT_PRICE_TTL));
        prices.prime("AAPL", 231.5).await;
        // No API key and nothing primed: every headline fetch fails.
        let news = Arc::new(NewsClient::new(None));

        let tool = MarketBriefingTool::new(provider, prices, news);
        let result = tool
            .execute(serde_json::json!({"symbols": ["AAPL"]}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output["headline_count"], 0);
    }
}
