//! Two-stock comparison tool
//!
//! Fans out the two price lookups and two advice generations concurrently,
//! then asks the model for one comparative summary over the four results.

use super::advice::generate_advice;
use crate::error::{Error, Result};
use crate::market::PriceClient;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::symbol::SymbolResolver;
use midas_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const COMPARE_SYSTEM_PROMPT: &str = "당신은 주식 비교 어시스턴트입니다. \
두 종목의 가격과 의견을 바탕으로 공통점과 차이점을 비교하고, \
[비교 요약]과 [판단 포인트] 두 섹션으로 한국어 결론을 작성하세요.";

/// Compares two stocks side by side.
pub struct CompareStocksTool {
    definition: ToolDefinition,
    provider: Arc<dyn LlmProvider>,
    resolver: Arc<SymbolResolver>,
    prices: Arc<PriceClient>,
}

impl CompareStocksTool {
    /// Create the tool.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        resolver: Arc<SymbolResolver>,
        prices: Arc<PriceClient>,
    ) -> Self {
        let definition = ToolDefinition::new(
            "compare_two_stocks",
            "두 종목의 가격과 투자 의견을 나란히 비교합니다.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "first": {"type": "string", "description": "첫 번째 종목 (이름 또는 티커)"},
                "second": {"type": "string", "description": "두 번째 종목 (이름 또는 티커)"}
            },
            "required": ["first", "second"]
        }));
        Self {
            definition,
            provider,
            resolver,
            prices,
        }
    }

    fn str_arg<'a>(input: &'a serde_json::Value, key: &str) -> Option<&'a str> {
        input
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[async_trait::async_trait]
impl Tool for CompareStocksTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        if Self::str_arg(input, "first").is_none() || Self::str_arg(input, "second").is_none() {
            return Err(Error::InvalidInput(
                "first and second are required".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let first = Self::str_arg(&input, "first").unwrap_or_default();
        let second = Self::str_arg(&input, "second").unwrap_or_default();

        let (a, b) = tokio::join!(self.resolver.resolve(first), self.resolver.resolve(second));
        let (Some(sym_a), Some(sym_b)) = (a, b) else {
            return Ok(ToolResult::failure(
                format!("❌ 비교할 종목을 찾지 못했습니다: '{first}', '{second}'"),
                start.elapsed().as_millis() as u64,
            ));
        };

        debug!(first = %sym_a, second = %sym_b, "Comparing stocks");

        // Two quotes and two opinions, all in flight at once.
        let (price_a, price_b, advice_a, advice_b) = tokio::join!(
            self.prices.price(&sym_a),
            self.prices.price(&sym_b),
            generate_advice(&self.provider, &sym_a),
            generate_advice(&self.provider, &sym_b),
        );

        let describe_price = |symbol: &str, price: &Result<f64>| match price {
            Ok(p) => PriceClient::format_price(symbol, *p),
            Err(_) => format!("{symbol}의 가격을 조회하지 못했습니다."),
        };
        let describe_advice = |advice: &Result<String>| match advice {
            Ok(text) => text.clone(),
            Err(_) => "의견을 생성하지 못했습니다.".to_string(),
        };

        let context = format!(
            "[{sym_a}]\n가격: {}\n의견:\n{}\n\n[{sym_b}]\n가격: {}\n의견:\n{}",
            describe_price(&sym_a, &price_a),
            describe_advice(&advice_a),
            describe_price(&sym_b, &price_b),
            describe_advice(&advice_b),
        );

        let request = CompletionRequest::new(self.provider.default_model())
            .with_message(Message::system(COMPARE_SYSTEM_PROMPT))
            .with_message(Message::user(format!(
                "{sym_a}와 {sym_b}를 비교해 주세요.\n\n{context}"
            )))
            .with_max_tokens(900)
            .with_temperature(0.4);

        match self.provider.complete(request).await {
            Ok(response) => Ok(ToolResult::success(
                serde_json::json!({
                    "first": sym_a,
                    "second": sym_b,
                    "comparison": response.content,
                }),
                start.elapsed().as_millis() as u64,
            )),
            Err(e) => Ok(ToolResult::failure(
                format!("❌ 비교 요약 생성에 실패했습니다: {e}"),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}
