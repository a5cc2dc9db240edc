//! Thread context - conversation state for one thread
//!
//! The message list is the durable record of a conversation, including
//! assistant tool calls and their tool responses. Appends that would break
//! the call/response pairing are rejected so a checkpoint can always be
//! replayed against an OpenAI-style wire format.

use crate::error::{Error, Result};
use crate::proposal::PendingProposal;
use chrono::{DateTime, Utc};
use midas_llm::{Message, MessageRole, ToolCall};
use serde::{Deserialize, Serialize};

/// Conversation state for a single thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Thread identifier
    pub thread_id: String,
    /// Full conversation history (without the system prompt)
    pub messages: Vec<Message>,
    /// Proposal awaiting a decision, if any
    pub pending: Option<PendingProposal>,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp
    pub last_activity: DateTime<Utc>,
}

impl ThreadContext {
    /// Create a new empty thread.
    #[must_use]
    pub fn new(thread_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            pending: None,
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a user message.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
        self.touch();
    }

    /// Append a plain assistant message.
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
        self.touch();
    }

    /// Append an assistant message that requests tool calls.
    pub fn add_assistant_tool_calls(
        &mut self,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) {
        self.messages
            .push(Message::assistant_with_tool_calls(content, tool_calls));
        self.touch();
    }

    /// Append a tool response for a previously issued tool call.
    ///
    /// Fails if no assistant message issued `tool_call_id`, or if that
    /// call already has a response.
    pub fn add_tool_result(
        &mut self,
        tool_call_id: &str,
        content: impl Into<String>,
    ) -> Result<()> {
        let issued = self.messages.iter().any(|m| {
            m.role == MessageRole::Assistant && m.tool_calls.iter().any(|c| c.id == tool_call_id)
        });
        if !issued {
            return Err(Error::History(format!(
                "tool result for unknown call id '{tool_call_id}'"
            )));
        }
        let answered = self.messages.iter().any(|m| {
            m.role == MessageRole::Tool && m.tool_call_id.as_deref() == Some(tool_call_id)
        });
        if answered {
            return Err(Error::History(format!(
                "tool call '{tool_call_id}' already has a response"
            )));
        }
        self.messages
            .push(Message::tool_response(tool_call_id, content));
        self.touch();
        Ok(())
    }

    /// Role of the last message, if any.
    #[must_use]
    pub fn last_role(&self) -> Option<MessageRole> {
        self.messages.last().map(|m| m.role)
    }

    /// Number of messages in the thread.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
