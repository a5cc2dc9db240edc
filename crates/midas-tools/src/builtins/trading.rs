//! Portfolio trading tools
//!
//! Buy and sell orders arrive as `"SYMBOL,QTY[,PRICE]"` strings. Each
//! order takes the symbol's lock for the whole read-modify-write so that
//! concurrent orders on the same symbol serialize and the blended average
//! price stays correct.

use crate::error::{Error, Result};
use crate::portfolio::{PortfolioStore, Position, SymbolLocks};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

fn order_arg(input: &serde_json::Value) -> Result<&str> {
    input
        .get("order")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput("order is required".to_string()))
}

fn parse_buy_order(order: &str) -> Option<(String, i64, f64)> {
    let parts: Vec<&str> = order.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }
    let symbol = parts[0].to_uppercase();
    let quantity: i64 = parts[1].parse().ok().filter(|q| *q > 0)?;
    let price: f64 = parts[2].parse().ok().filter(|p| *p > 0.0)?;
    Some((symbol, quantity, price))
}

fn parse_sell_order(order: &str) -> Option<(String, i64)> {
    let parts: Vec<&str> = order.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return None;
    }
    let symbol = parts[0].to_uppercase();
    let quantity: i64 = parts[1].parse().ok().filter(|q| *q > 0)?;
    Some((symbol, quantity))
}

/// Records a buy order, blending the average purchase price.
pub struct BuyStockTool {
    definition: ToolDefinition,
    store: Arc<dyn PortfolioStore>,
    locks: Arc<SymbolLocks>,
}

impl BuyStockTool {
    /// Create the tool.
    #[must_use]
    pub fn new(store: Arc<dyn PortfolioStore>, locks: Arc<SymbolLocks>) -> Self {
        let definition = ToolDefinition::new(
            "buy_stock",
            "주식을 매수하고 포트폴리오에 기록합니다. 평단가를 자동으로 계산합니다. \
             인자 형식: '종목,수량,가격' (예: 'AAPL,10,200.50')",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "order": {
                    "type": "string",
                    "description": "'종목,수량,가격' 형식의 주문"
                }
            },
            "required": ["order"]
        }));
        Self {
            definition,
            store,
            locks,
        }
    }
}

#[async_trait::async_trait]
impl Tool for BuyStockTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        order_arg(input).map(|_| ())
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let order = order_arg(&input)?;

        let Some((symbol, quantity, price)) = parse_buy_order(order) else {
            return Ok(ToolResult::failure(
                "❌ 입력 형식이 올바르지 않습니다. '종목,수량,가격' 형식으로 입력해주세요.",
                start.elapsed().as_millis() as u64,
            ));
        };

        // Critical section: quantity/average must be read and written atomically.
        let _guard = self.locks.acquire(&symbol).await;

        let existing = self
            .store
            .get(&symbol)
            .await
            .map_err(|e| Error::Execution(format!("포트폴리오 조회 실패: {e}")))?;

        let (position, message) = match existing {
            Some(held) => {
                let total_quantity = held.quantity + quantity;
                let total_cost =
                    held.purchase_price * held.quantity as f64 + price * quantity as f64;
                let new_avg = total_cost / total_quantity as f64;
                (
                    Position {
                        symbol: symbol.clone(),
                        quantity: total_quantity,
                        purchase_price: new_avg,
                        created_at: Utc::now(),
                    },
                    format!(
                        "✅ {symbol} {quantity}주를 추가 매수했습니다. (총 {total_quantity}주, 평단가: {new_avg:.2})"
                    ),
                )
            }
            None => (
                Position {
                    symbol: symbol.clone(),
                    quantity,
                    purchase_price: price,
                    created_at: Utc::now(),
                },
                format!("✅ {symbol} {quantity}주를 신규 매수하여 기록했습니다."),
            ),
        };

        if let Err(e) = self.store.upsert(&position).await {
            return Ok(ToolResult::failure(
                format!("❌ {symbol} 거래 기록에 실패했습니다: {e}"),
                start.elapsed().as_millis() as u64,
            ));
        }

        info!(symbol = %symbol, quantity, price, "Buy order recorded");
        Ok(ToolResult::success(
            serde_json::json!({
                "symbol": symbol,
                "quantity": position.quantity,
                "purchase_price": position.purchase_price,
                "message": message,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Records a sell order, deleting the row when the position closes.
pub struct SellStockTool {
    definition: ToolDefinition,
    store: Arc<dyn PortfolioStore>,
    locks: Arc<SymbolLocks>,
}

impl SellStockTool {
    /// Create the tool.
    #[must_use]
    pub fn new(store: Arc<dyn PortfolioStore>, locks: Arc<SymbolLocks>) -> Self {
        let definition = ToolDefinition::new(
            "sell_stock",
            "보유 주식을 매도합니다. 수량이 0이 되면 포트폴리오에서 삭제됩니다. \
             인자 형식: '종목,수량' (예: 'AAPL,5')",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "order": {
                    "type": "string",
                    "description": "'종목,수량' 형식의 주문"
                }
            },
            "required": ["order"]
        }));
        Self {
            definition,
            store,
            locks,
        }
    }
}

#[async_trait::async_trait]
impl Tool for SellStockTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        order_arg(input).map(|_| ())
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let order = order_arg(&input)?;

        let Some((symbol, quantity)) = parse_sell_order(order) else {
            return Ok(ToolResult::failure(
                "❌ 입력 형식이 올바르지 않습니다. '종목,수량' 형식으로 입력해주세요. (예: 'AAPL,5')",
                start.elapsed().as_millis() as u64,
            ));
        };

        let _guard = self.locks.acquire(&symbol).await;

        let Some(held) = self
            .store
            .get(&symbol)
            .await
            .map_err(|e| Error::Execution(format!("포트폴리오 조회 실패: {e}")))?
        else {
            return Ok(ToolResult::failure(
                format!("❌ {symbol}을(를) 보유하고 있지 않아 매도할 수 없습니다."),
                start.elapsed().as_millis() as u64,
            ));
        };

        if held.quantity < quantity {
            return Ok(ToolResult::failure(
                format!(
                    "❌ 매도하려는 수량({quantity}주)이 보유 수량({}주)보다 많습니다.",
                    held.quantity
                ),
                start.elapsed().as_millis() as u64,
            ));
        }

        let remaining = held.quantity - quantity;
        let message = if remaining > 0 {
            let position = Position {
                symbol: symbol.clone(),
                quantity: remaining,
                purchase_price: held.purchase_price,
                created_at: Utc::now(),
            };
            if let Err(e) = self.store.upsert(&position).await {
                return Ok(ToolResult::failure(
                    format!("❌ {symbol} 정보 업데이트에 실패했습니다: {e}"),
                    start.elapsed().as_millis() as u64,
                ));
            }
            format!("✅ {symbol} {quantity}주를 매도했습니다. (남은 수량: {remaining}주)")
        } else {
            if let Err(e) = self.store.delete(&symbol).await {
                return Ok(ToolResult::failure(
                    format!("❌ {symbol} 종목 삭제에 실패했습니다: {e}"),
                    start.elapsed().as_millis() as u64,
                ));
            }
            format!("✅ {symbol} {quantity}주를 전량 매도하여 포트폴리오에서 삭제했습니다.")
        };

        info!(symbol = %symbol, quantity, remaining, "Sell order recorded");
        Ok(ToolResult::success(
            serde_json::json!({
                "symbol": symbol,
                "remaining": remaining,
                "message": message,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Lists current holdings.
pub struct PortfolioSummaryTool {
    definition: ToolDefinition,
    store: Arc<dyn PortfolioStore>,
}

impl PortfolioSummaryTool {
    /// Create the tool.
    #[must_use]
    pub fn new(store: Arc<dyn PortfolioStore>) -> Self {
        let definition = ToolDefinition::new(
            "get_portfolio_summary",
            "현재 보유 중인 종목과 수량, 평단가를 요약합니다.",
        );
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for PortfolioSummaryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let positions = self
            .store
            .list()
            .await
            .map_err(|e| Error::Execution(format!("포트폴리오 조회 실패: {e}")))?;

        let message = if positions.is_empty() {
            "보유 중인 종목이 없습니다.".to_string()
        } else {
            let lines: Vec<String> = positions
                .iter()
                .map(|p| {
                    format!(
                        "- {}: {}주 (평단가 {:.2})",
                        p.symbol, p.quantity, p.purchase_price
                    )
                })
                .collect();
            format!("현재 보유 종목:\n{}", lines.join("\n"))
        };

        Ok(ToolResult::success(
            serde_json::json!({
                "positions": positions,
                "message": message,
            }),
            start.elapsed().as_millis() as u64,
        ))
    }
}
