//! Stock price lookup tool

use crate::error::{Error, Result};
use crate::market::PriceClient;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::symbol::SymbolResolver;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Looks up the current price for a stock named in free form.
pub struct StockPriceTool {
    definition: ToolDefinition,
    resolver: Arc<SymbolResolver>,
    prices: Arc<PriceClient>,
}

impl StockPriceTool {
    /// Create the tool.
    #[must_use]
    pub fn new(resolver: Arc<SymbolResolver>, prices: Arc<PriceClient>) -> Self {
        let definition = ToolDefinition::new(
            "get_stock_price",
            "회사 이름이나 티커로 주식의 현재 가격을 조회합니다. 예: '삼성전자', 'AAPL'",
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
            resolver,
            prices,
        }
    }
}

#[async_trait::async_trait]
impl Tool for StockPriceTool {
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

        debug!(query = %query, symbol = %symbol, "Resolved price query");

        match self.prices.price(&symbol).await {
            Ok(price) => Ok(ToolResult::success(
                serde_json::json!({
                    "symbol": symbol,
                    "price": price,
                    "message": PriceClient::format_price(&symbol, price),
                }),
                start.elapsed().as_millis() as u64,
            )),
            Err(e) => Ok(ToolResult::failure(
                format!("❌ 가격 조회에 실패했습니다: {symbol} ({e})"),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}
