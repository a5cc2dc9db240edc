//! Mock LLM provider for testing
//!
//! Returns queued responses in FIFO order, or a default empty response
//! when the queue is drained. Separate queues exist for plain completions
//! (used by the question synthesizer and advice generation) and tool
//! completions (used by the planner).

use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::Result;
use crate::provider::LlmProvider;
use crate::tools::ToolCall;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock LLM provider that returns queued responses or default empty ones.
pub struct MockProvider {
    tool_responses: Arc<Mutex<VecDeque<ToolCompletionResponse>>>,
    text_responses: Arc<Mutex<VecDeque<String>>>,
    fail_completions: Arc<Mutex<bool>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tool_responses: Arc::new(Mutex::new(VecDeque::new())),
            text_responses: Arc::new(Mutex::new(VecDeque::new())),
            fail_completions: Arc::new(Mutex::new(false)),
        }
    }

    /// Queue a full tool completion response.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.tool_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Queue a response that proposes the given tool calls.
    pub fn add_tool_calls(&self, tool_calls: Vec<ToolCall>) {
        self.add_tool_response(ToolCompletionResponse {
            content: None,
            tool_calls,
            usage: None,
            finish_reason: Some("tool_calls".to_string()),
            model: "mock-model".to_string(),
        });
    }

    /// Queue a final text answer (no tool calls).
    pub fn add_final_answer(&self, content: impl Into<String>) {
        self.add_tool_response(ToolCompletionResponse {
            content: Some(content.into()),
            tool_calls: vec![],
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: "mock-model".to_string(),
        });
    }

    /// Queue a plain-completion response.
    pub fn add_text_response(&self, content: impl Into<String>) {
        self.text_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(content.into());
    }

    /// Make all plain completions fail until reset.
    pub fn set_fail_completions(&self, fail: bool) {
        *self
            .fail_completions
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = fail;
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        if *self
            .fail_completions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
        {
            return Err(crate::error::Error::Api("mock completion failure".into()));
        }
        let content = self
            .text_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string());
        Ok(CompletionResponse {
            content,
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: "mock-model".to_string(),
        })
    }

    async fn complete_with_tools(
        &self,
        _request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let mut responses = self
            .tool_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(resp) = responses.pop_front() {
            Ok(resp)
        } else {
            // Default behavior if queue empty
            Ok(ToolCompletionResponse {
                content: Some("mock response".to_string()),
                tool_calls: vec![],
                usage: None,
                finish_reason: Some("stop".to_string()),
                model: "mock-model".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionRequest;

    #[tokio::test]
    async fn test_queued_responses_fifo() {
        let mock = MockProvider::new();
        mock.add_tool_calls(vec![ToolCall {
            id: "call_1".to_string(),
            name: "get_stock_price".to_string(),
            arguments: r#"{"symbol": "AAPL"}"#.to_string(),
        }]);
        mock.add_final_answer("완료했습니다");

        let req = ToolCompletionRequest::new(CompletionRequest::new("mock-model"), vec![]);
        let first = mock.complete_with_tools(req.clone()).await.unwrap();
        assert!(first.has_tool_calls());

        let second = mock.complete_with_tools(req).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("완료했습니다"));
        assert!(!second.has_tool_calls());
    }

    #[tokio::test]
    async fn test_text_queue_and_failure_mode() {
        let mock = MockProvider::new();
        mock.add_text_response("합성된 질문");

        let resp = mock
            .complete(CompletionRequest::new("mock-model"))
            .await
            .unwrap();
        assert_eq!(resp.content, "합성된 질문");

        mock.set_fail_completions(true);
        assert!(mock
            .complete(CompletionRequest::new("mock-model"))
            .await
            .is_err());
    }
}
