//! Midas Tools - Finance Tool Registry and Execution Engine
//!
//! This crate provides the capability layer for the Midas assistant:
//! - Registry: tool registration and discovery
//! - Runner: tool execution with bounded timeouts
//! - Builtins: the finance toolset (price, advice, compare, trading,
//!   term explanation, market briefing)
//! - Symbol resolution, market data, news headlines and portfolio
//!   storage backing them

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod error;
pub mod market;
pub mod news;
pub mod portfolio;
pub mod registry;
pub mod runner;
pub mod symbol;

pub use builtins::{register_builtins, FinanceDeps};
pub use error::{Error, Result};
pub use market::{PriceClient, DEFAULT_PRICE_TTL};
pub use news::{Headline, NewsClient, DEFAULT_HEADLINE_LIMIT};
pub use portfolio::{
    MemoryPortfolioStore, PortfolioStore, Position, RestPortfolioStore, SymbolLocks,
};
pub use registry::{Tool, ToolDefinition, ToolRegistry, ToolResult};
pub use runner::{ExecutionOptions, ExecutionResult, RunnerConfig, ToolRunner};
pub use symbol::{is_krx_symbol, looks_like_ticker, SymbolResolver};
