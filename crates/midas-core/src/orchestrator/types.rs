//! Turn result types

use crate::proposal::PendingProposal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one executed tool call within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name
    pub tool_name: String,
    /// Parsed input arguments
    pub input: serde_json::Value,
    /// Tool output (error payload on failure)
    pub output: serde_json::Value,
    /// Whether the tool reported success
    pub success: bool,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

/// Outcome of one orchestrator entry point call.
#[derive(Debug, Clone)]
pub enum TurnResult {
    /// The turn produced a final answer.
    Final {
        /// Turn ID
        turn_id: Uuid,
        /// Final answer text
        answer: String,
        /// Tools executed during this call
        tool_calls: Vec<ToolCallRecord>,
        /// Planning iterations used
        iterations: usize,
    },
    /// The turn is suspended behind the decision gate.
    AwaitingDecision {
        /// Turn ID
        turn_id: Uuid,
        /// The proposal waiting for a decision
        proposal: PendingProposal,
    },
}

impl TurnResult {
    /// Whether the turn produced a final answer.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final { .. })
    }

    /// The final answer, if any.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Final { answer, .. } => Some(answer),
            Self::AwaitingDecision { .. } => None,
        }
    }

    /// The pending proposal, if suspended.
    #[must_use]
    pub fn proposal(&self) -> Option<&PendingProposal> {
        match self {
            Self::Final { .. } => None,
            Self::AwaitingDecision { proposal, .. } => Some(proposal),
        }
    }
}
