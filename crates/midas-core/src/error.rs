//! Error types for midas-core
//!
//! Structural failures (unknown tool, persistence, decision conflicts)
//! propagate to the caller as distinct kinds. Capability failures never
//! appear here: a failed adapter becomes conversation content and the
//! model replans around it.

use thiserror::Error;

/// Orchestration error type
#[derive(Debug, Error)]
pub enum Error {
    /// The model proposed a tool name that is not in the registry
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Checkpoint store failure — fatal to the turn
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Decision targets a missing, stale or already-consumed proposal,
    /// or a new message arrived while a decision was pending
    #[error("decision conflict: {0}")]
    DecisionConflict(String),

    /// The pending proposal's approval window elapsed; the plan was discarded
    #[error("proposal expired")]
    ProposalExpired,

    /// Append would violate the conversation ordering invariant
    #[error("history error: {0}")]
    History(String),

    /// Planning failed
    #[error("planning error: {0}")]
    Planning(String),

    /// LLM error
    #[error("llm error: {0}")]
    Llm(#[from] midas_llm::Error),

    /// Tool layer error
    #[error("tool error: {0}")]
    Tool(#[from] midas_tools::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
