//! Orchestrator - the turn engine
//!
//! Two entry points drive every conversation:
//! - `handle_message` starts a turn from a user message
//! - `handle_decision` resumes a suspended turn with the user's decision
//!
//! A turn runs the planning loop until it either produces a final answer
//! or proposes a tool call, which suspends the turn behind the decision
//! gate. No tool ever runs without an approval.

mod config;
mod core;
mod decision;
mod process;
mod types;

#[cfg(test)]
mod tests;

pub use config::{DisclaimerPolicy, OrchestratorConfig, DEFAULT_DISCLAIMER};
pub use core::Orchestrator;
pub use types::{ToolCallRecord, TurnResult};
