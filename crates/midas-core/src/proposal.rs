//! Tool proposals and user decisions
//!
//! Every tool call the planner produces becomes a `PendingProposal` that
//! suspends the turn until the user decides. The nonce binds a decision to
//! one specific suspension: a replayed decision carries a consumed nonce
//! and is rejected as a conflict.

use chrono::{DateTime, Duration, Utc};
use midas_llm::ToolCall;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tool call waiting for user confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingProposal {
    /// Unique proposal ID
    pub id: Uuid,
    /// Single-use token for replay defense
    pub nonce: Uuid,
    /// Thread this proposal belongs to
    pub thread_id: String,
    /// Effective question the plan answers (may be synthesized)
    pub question: String,
    /// The proposed tool call
    pub call: ToolCall,
    /// When the proposal was created
    pub created_at: DateTime<Utc>,
    /// When the approval window closes
    pub expires_at: DateTime<Utc>,
}

impl PendingProposal {
    /// Create a new proposal with the given approval window.
    #[must_use]
    pub fn new(
        thread_id: impl Into<String>,
        question: impl Into<String>,
        call: ToolCall,
        timeout_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            nonce: Uuid::new_v4(),
            thread_id: thread_id.into(),
            question: question.into(),
            call,
            created_at: now,
            expires_at: now + Duration::seconds(timeout_secs),
        }
    }

    /// Whether the approval window has closed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Human-readable summary of the proposed action.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("도구 '{}' 실행 요청: {}", self.call.name, self.call.arguments)
    }
}

/// The user's decision on a pending proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Run the proposed tool call as-is
    Approve,
    /// Discard the plan and replan with corrected instructions
    Modify {
        /// The corrected instruction text
        text: String,
    },
    /// Discard the plan; the text explains what to do instead
    Reject {
        /// The user's rejection text
        text: String,
    },
}

impl Decision {
    /// The corrective text for modify/reject decisions.
    #[must_use]
    pub fn correction(&self) -> Option<&str> {
        match self {
            Self::Approve => None,
            Self::Modify { text } | Self::Reject { text } => Some(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "buy_stock".to_string(),
            arguments: r#"{"order": "AAPL,10,200"}"#.to_string(),
        }
    }

    #[test]
    fn test_proposal_window() {
        let p = PendingProposal::new("thread-1", "AAPL 10주 매수해줘", call(), 300);
        assert!(!p.is_expired());
        assert_ne!(p.id, p.nonce);

        let expired = PendingProposal::new("thread-1", "AAPL 10주 매수해줘", call(), -1);
        assert!(expired.is_expired());
    }

    #[test]
    fn test_decision_correction() {
        assert!(Decision::Approve.correction().is_none());
        assert_eq!(
            Decision::Modify {
                text: "5주만 사줘".to_string()
            }
            .correction(),
            Some("5주만 사줘")
        );
        assert_eq!(
            Decision::Reject {
                text: "사지 마".to_string()
            }
            .correction(),
            Some("사지 마")
        );
    }

    #[test]
    fn test_proposal_serde_round_trip() {
        let p = PendingProposal::new("thread-1", "질문", call(), 300);
        let json = serde_json::to_string(&p).unwrap();
        let back: PendingProposal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, p.id);
        assert_eq!(back.nonce, p.nonce);
        assert_eq!(back.call.name, "buy_stock");
    }
}
