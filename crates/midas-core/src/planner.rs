//! Planner - LLM-driven tool selection
//!
//! One planning step takes the conversation so far plus the tool schemas
//! and returns either a final text answer or a set of proposed tool calls.
//! The planner never executes anything; proposals go through the decision
//! gate first.

use crate::error::Result;
use midas_llm::util::truncate_safe;
use midas_llm::{
    CompletionRequest, LlmProvider, Message, ToolCall, ToolCompletionRequest, ToolDefinition,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Tool results longer than this are truncated before re-entering the
/// conversation, to keep prompts bounded.
pub const MAX_TOOL_RESULT_CHARS: usize = 4000;

/// Default system prompt for the finance assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "당신은 Midas, 주식과 금융 질문에 답하는 어시스턴트입니다.\n\
- 사용자가 쓴 언어로 답하세요. 한국어 질문에는 한국어로 답합니다.\n\
- 시세 조회, 종목 조언, 종목 비교, 매수/매도, 포트폴리오 조회, 용어 설명, 시장 브리핑이 \
필요하면 반드시 해당 도구를 호출하세요. 직접 지어내지 마세요.\n\
- 한 번에 하나의 도구만 호출하세요. 모든 도구는 사용자 승인 후에 실행됩니다.\n\
- 매수 주문 인자는 '종목,수량,가격' 형식이고 매도 주문 인자는 '종목,수량' 형식입니다.\n\
- 도구 결과를 받으면 그 데이터를 근거로 간결하게 정리해 답하세요.";

/// Planner configuration
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// System prompt prepended to every planning request
    pub system_prompt: String,
    /// Model override; the provider default is used when `None`
    pub default_model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens per planning step
    pub max_tokens: Option<u32>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            default_model: None,
            temperature: Some(0.7),
            max_tokens: Some(4096),
        }
    }
}

impl PlannerConfig {
    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Result of one planning step
#[derive(Debug, Clone)]
pub struct PlanResponse {
    /// Text content, if any
    pub content: Option<String>,
    /// Proposed tool calls
    pub tool_calls: Vec<ToolCall>,
    /// Whether this is a final answer (no tool calls)
    pub is_final: bool,
    /// Finish reason from the provider
    pub finish_reason: Option<String>,
    /// Model that produced the response
    pub model: String,
}

impl PlanResponse {
    /// Whether the plan proposes tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// LLM-driven planner
pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    config: PlannerConfig,
}

impl Planner {
    /// Create a new planner.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: PlannerConfig) -> Self {
        Self { provider, config }
    }

    /// Create a planner with default configuration.
    #[must_use]
    pub fn with_defaults(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, PlannerConfig::default())
    }

    /// Get the provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run one planning step over the conversation.
    ///
    /// The system prompt is prepended here; `messages` holds only the
    /// persisted conversation.
    #[instrument(skip(self, messages, tools), fields(messages = messages.len(), tools = tools.len()))]
    pub async fn plan_step(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<PlanResponse> {
        let model = self
            .config
            .default_model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        let mut request = CompletionRequest::new(&model)
            .with_message(Message::system(&self.config.system_prompt))
            .with_messages(messages.to_vec());
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self
            .provider
            .complete_with_tools(ToolCompletionRequest::new(request, tools.to_vec()))
            .await?;

        debug!(
            tool_calls = response.tool_calls.len(),
            finish_reason = ?response.finish_reason,
            "Planning step completed"
        );

        let is_final = !response.has_tool_calls();
        Ok(PlanResponse {
            content: response.content,
            tool_calls: response.tool_calls,
            is_final,
            finish_reason: response.finish_reason,
            model: response.model,
        })
    }
}

/// Render a tool execution output as conversation content, truncated to
/// [`MAX_TOOL_RESULT_CHARS`].
#[must_use]
pub fn render_tool_output(output: &serde_json::Value) -> String {
    let text = match output {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.len() > MAX_TOOL_RESULT_CHARS {
        format!("{}... (truncated)", truncate_safe(&text, MAX_TOOL_RESULT_CHARS))
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midas_llm::MockProvider;

    #[tokio::test]
    async fn test_plan_step_final_answer() {
        let mock = Arc::new(MockProvider::new());
        mock.add_final_answer("금리는 돈을 빌린 대가입니다.");
        let planner = Planner::with_defaults(mock);

        let plan = planner
            .plan_step(&[Message::user("금리가 뭐야?")], &[])
            .await
            .unwrap();

        assert!(plan.is_final);
        assert!(!plan.has_tool_calls());
        assert_eq!(plan.content.as_deref(), Some("금리는 돈을 빌린 대가입니다."));
    }

    #[tokio::test]
    async fn test_plan_step_tool_call() {
        let mock = Arc::new(MockProvider::new());
        mock.add_tool_calls(vec![ToolCall {
            id: "call_1".to_string(),
            name: "get_stock_price".to_string(),
            arguments: r#"{"name_or_symbol": "AAPL"}"#.to_string(),
        }]);
        let planner = Planner::with_defaults(mock);

        let plan = planner
            .plan_step(&[Message::user("AAPL 주가 알려줘")], &[])
            .await
            .unwrap();

        assert!(!plan.is_final);
        assert_eq!(plan.tool_calls[0].name, "get_stock_price");
    }

    #[test]
    fn test_render_tool_output_truncates() {
        let long = "a".repeat(MAX_TOOL_RESULT_CHARS + 100);
        let rendered = render_tool_output(&serde_json::Value::String(long));
        assert!(rendered.ends_with("... (truncated)"));
        assert!(rendered.len() < MAX_TOOL_RESULT_CHARS + 32);

        let short = render_tool_output(&serde_json::json!({"price": 231.5}));
        assert!(short.contains("231.5"));
    }
}
