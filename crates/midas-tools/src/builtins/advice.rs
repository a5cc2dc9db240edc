//! Stock advice tool
//!
//! Generates structured, clearly-labeled investment commentary for one
//! symbol. The output always carries the same four sections so downstream
//! consumers (the comparison tool, the UI) can rely on them.

use crate::error::{Error, Result};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::symbol::SymbolResolver;
use midas_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use std::time::Instant;

const ADVICE_SYSTEM_PROMPT: &str = "당신은 주식 분석 어시스턴트입니다. \
요청된 종목에 대해 반드시 [요약], [장점], [리스크], [결론] 네 개의 섹션으로 \
간결한 한국어 의견을 작성하세요. 투자 권유가 아닌 참고 정보임을 전제로 합니다.";

/// Generate the structured advice text for a resolved symbol.
pub(crate) async fn generate_advice(
    provider: &Arc<dyn LlmProvider>,
    symbol: &str,
) -> Result<String> {
    let request = CompletionRequest::new(provider.default_model())
        .with_message(Message::system(ADVICE_SYSTEM_PROMPT))
        .with_message(Message::user(format!("{symbol} 종목에 대한 의견을 주세요.")))
        .with_max_tokens(700)
        .with_temperature(0.4);

    let response = provider
        .complete(request)
        .await
        .map_err(|e| Error::Execution(format!("의견 생성 실패: {e}")))?;

    if response.content.trim().is_empty() {
        return Err(Error::Execution("의견 생성 결과가 비어 있습니다".to_string()));
    }
    Ok(response.content)
}

/// Produces a structured opinion on a single stock.
pub struct StockAdviceTool {
    definition: ToolDefinition,
    provider: Arc<dyn LlmProvider>,
    resolver: Arc<SymbolResolver>,
}

impl StockAdviceTool {
    /// Create the tool.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, resolver: Arc<SymbolResolver>) -> Self {
        let definition = ToolDefinition::new(
            "get_stock_advice",
            "특정 종목에 대한 구조화된 투자 의견([요약]/[장점]/[리스크]/[결론])을 생성합니다.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "name_or_symbol": {
                    "type": "string",
                    "description": "회사 이름 또는 티커 심볼"
                }
            },
            "required": ["name_or_symbol"]
        }));
        Self {
            definition,
            provider,
            resolver,
        }
    }
}

#[async_trait::async_trait]
impl Tool for StockAdviceTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        input
            .get("name_or_symbol")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|_| ())
            .ok_or_else(|| Error::InvalidInput("name_or_symbol is required".to_string()))
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let query = input
            .get("name_or_symbol")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        let Some(symbol) = self.resolver.resolve(query).await else {
            return Ok(ToolResult::failure(
                format!("❌ 종목을 찾지 못했습니다: '{query}'"),
                start.elapsed().as_millis() as u64,
            ));
        };

        match generate_advice(&self.provider, &symbol).await {
            Ok(advice) => Ok(ToolResult::success(
                serde_json::json!({
                    "symbol": symbol,
                    "advice": advice,
                }),
                start.elapsed().as_millis() as u64,
            )),
            Err(e) => Ok(ToolResult::failure(
                e.to_string(),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midas_llm::MockProvider;

    #[tokio::test]
    async fn test_advice_success() {
        let mock = Arc::new(MockProvider::new());
        mock.add_text_response("[요약] 견조\n[장점] 수요\n[리스크] 환율\n[결론] 관망");
        let provider: Arc<dyn LlmProvider> = mock;

        let tool = StockAdviceTool::new(provider, Arc::new(SymbolResolver::new()));
        let result = tool
            .execute(serde_json::json!({"name_or_symbol": "AAPL"}))
            .await
            .unwrap();

        assert!(result.success);
        let advice = result.output["advice"].as_str().unwrap();
        assert!(advice.contains("[요약]"));
        assert!(advice.contains("[결론]"));
    }

    #[tokio::test]
    async fn test_advice_provider_failure_is_soft() {
        let mock = Arc::new(MockProvider::new());
        mock.set_fail_completions(true);
        let provider: Arc<dyn LlmProvider> = mock;

        let tool = StockAdviceTool::new(provider, Arc::new(SymbolResolver::new()));
        let result = tool
            .execute(serde_json::json!({"name_or_symbol": "AAPL"}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("의견 생성 실패"));
    }
}
