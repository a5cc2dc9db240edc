//! Built-in finance tools
//!
//! Every adapter implements [`Tool`](crate::registry::Tool) with the same
//! contract: JSON object in, `ToolResult` out, no panics. User-facing
//! strings are Korean, matching the assistant's audience.

mod advice;
mod briefing;
mod compare;
mod price;
mod term_explain;
mod trading;

pub use advice::StockAdviceTool;
pub use briefing::MarketBriefingTool;
pub use compare::CompareStocksTool;
pub use price::StockPriceTool;
pub use term_explain::TermExplainTool;
pub use trading::{BuyStockTool, PortfolioSummaryTool, SellStockTool};

use crate::market::PriceClient;
use crate::news::NewsClient;
use crate::portfolio::{PortfolioStore, SymbolLocks};
use crate::registry::ToolRegistry;
use crate::symbol::SymbolResolver;
use midas_llm::LlmProvider;
use std::sync::Arc;

/// Shared dependencies for the built-in tools.
#[derive(Clone)]
pub struct FinanceDeps {
    /// LLM provider for advice, comparison, explanation and briefing
    pub provider: Arc<dyn LlmProvider>,
    /// Symbol resolver
    pub resolver: Arc<SymbolResolver>,
    /// Quote client
    pub prices: Arc<PriceClient>,
    /// Headline feed for briefings
    pub news: Arc<NewsClient>,
    /// Portfolio backend
    pub portfolio: Arc<dyn PortfolioStore>,
    /// Per-symbol order locks
    pub locks: Arc<SymbolLocks>,
}

/// Register the full finance toolset.
pub fn register_builtins(registry: &mut ToolRegistry, deps: &FinanceDeps) {
    registry.register(Arc::new(StockPriceTool::new(
        Arc::clone(&deps.resolver),
        Arc::clone(&deps.prices),
    )));
    registry.register(Arc::new(StockAdviceTool::new(
        Arc::clone(&deps.provider),
        Arc::clone(&deps.resolver),
    )));
    registry.register(Arc::new(CompareStocksTool::new(
        Arc::clone(&deps.provider),
        Arc::clone(&deps.resolver),
        Arc::clone(&deps.prices),
    )));
    registry.register(Arc::new(BuyStockTool::new(
        Arc::clone(&deps.portfolio),
        Arc::clone(&deps.locks),
    )));
    registry.register(Arc::new(SellStockTool::new(
        Arc::clone(&deps.portfolio),
        Arc::clone(&deps.locks),
    )));
    registry.register(Arc::new(PortfolioSummaryTool::new(Arc::clone(
        &deps.portfolio,
    ))));
    registry.register(Arc::new(TermExplainTool::new(Arc::clone(&deps.provider))));
    registry.register(Arc::new(MarketBriefingTool::new(
        Arc::clone(&deps.provider),
        Arc::clone(&deps.prices),
        Arc::clone(&deps.news),
    )));
}
