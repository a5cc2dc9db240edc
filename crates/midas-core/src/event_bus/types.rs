//! Turn lifecycle event types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted during a turn.
///
/// Observational only: the bus is lossy and subscribers must not be
/// required for correctness. The authoritative outcome of a turn is its
/// returned `TurnResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A turn started processing
    TurnStarted {
        /// Turn ID
        turn_id: Uuid,
        /// Thread ID
        thread_id: String,
    },
    /// A planning step started
    PlanningStarted {
        /// Turn ID
        turn_id: Uuid,
        /// Planning iteration (1-based)
        iteration: usize,
    },
    /// A tool proposal is waiting for a user decision
    DecisionRequired {
        /// Turn ID
        turn_id: Uuid,
        /// Proposal ID
        proposal_id: Uuid,
        /// Proposed tool name
        tool_name: String,
    },
    /// An approved tool started executing
    ToolStarted {
        /// Turn ID
        turn_id: Uuid,
        /// Tool call ID
        tool_call_id: String,
        /// Tool name
        tool_name: String,
    },
    /// Tool execution finished
    ToolCompleted {
        /// Turn ID
        turn_id: Uuid,
        /// Tool call ID
        tool_call_id: String,
        /// Tool name
        tool_name: String,
        /// Whether the tool reported success
        success: bool,
        /// Execution duration in milliseconds
        duration_ms: u64,
    },
    /// The turn completed with a final answer
    TurnCompleted {
        /// Turn ID
        turn_id: Uuid,
        /// Thread ID
        thread_id: String,
    },
    /// The turn failed with a structural error
    TurnFailed {
        /// Turn ID
        turn_id: Uuid,
        /// Error description
        error: String,
    },
}
