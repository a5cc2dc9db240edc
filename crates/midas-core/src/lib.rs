//! Midas Core - Conversation Orchestration Engine
//!
//! This crate drives the Midas finance assistant:
//! - Orchestrator: the turn engine with a mandatory decision gate in
//!   front of every tool execution
//! - Planner: LLM-driven tool selection over the conversation
//! - Threads: per-thread conversation state with checkpoint persistence
//! - Proposals: suspended tool calls and the approve/modify/reject flow
//! - Synthesizer: merges corrective instructions into one question
//! - Event bus and turn recorder for observation and audit

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event_bus;
pub mod orchestrator;
pub mod planner;
pub mod proposal;
pub mod recorder;
pub mod synthesizer;
pub mod thread;

pub use error::{Error, Result};
pub use event_bus::{EventBus, TurnEvent};
pub use orchestrator::{
    DisclaimerPolicy, Orchestrator, OrchestratorConfig, ToolCallRecord, TurnResult,
    DEFAULT_DISCLAIMER,
};
pub use planner::{PlanResponse, Planner, PlannerConfig, DEFAULT_SYSTEM_PROMPT};
pub use proposal::{Decision, PendingProposal};
pub use recorder::{HttpTurnRecorder, MemoryTurnRecorder, TurnRecord, TurnRecorder};
pub use synthesizer::QuestionSynthesizer;
pub use thread::{MemoryThreadStore, RedisThreadStore, ThreadContext, ThreadStore};
