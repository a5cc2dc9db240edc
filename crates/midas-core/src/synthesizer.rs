//! Question synthesizer
//!
//! After a modify/reject decision the original question and the corrective
//! instruction are merged into one standalone question, so the next
//! planning pass works from a single coherent intent instead of a
//! contradiction. Synthesis failure is recovered locally: the raw
//! corrective text stands in for the merged question.

use midas_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use tracing::{debug, warn};

const SYNTHESIS_SYSTEM_PROMPT: &str = "당신은 대화 맥락을 정리하는 어시스턴트입니다. \
사용자의 원래 질문과 수정 지시를 합쳐, 수정 지시를 우선하는 하나의 독립적인 질문으로 \
다시 작성하세요. 질문 한 문장만 출력하고 설명은 붙이지 마세요.";

/// Merges an original question with a corrective instruction.
pub struct QuestionSynthesizer {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl QuestionSynthesizer {
    /// Create a new synthesizer.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
        }
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Synthesize the effective question.
    ///
    /// Infallible: when the provider call fails or returns nothing usable,
    /// the corrective text itself becomes the effective question.
    pub async fn synthesize(&self, original: &str, correction: &str) -> String {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        let request = CompletionRequest::new(model)
            .with_message(Message::system(SYNTHESIS_SYSTEM_PROMPT))
            .with_message(Message::user(format!(
                "원래 질문: {original}\n수정 지시: {correction}"
            )))
            .with_max_tokens(200)
            .with_temperature(0.0);

        match self.provider.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                let question = response.content.trim().to_string();
                debug!(question = %question, "Synthesized effective question");
                question
            }
            Ok(_) => {
                warn!("Synthesis returned empty content, using correction as-is");
                correction.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Synthesis failed, using correction as-is");
                correction.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midas_llm::MockProvider;

    #[tokio::test]
    async fn test_synthesize_merges_question() {
        let mock = Arc::new(MockProvider::new());
        mock.add_text_response("AAPL 5주를 200달러에 매수해줘");
        let synthesizer = QuestionSynthesizer::new(mock);

        let question = synthesizer
            .synthesize("AAPL 10주 매수해줘", "5주만 사줘")
            .await;
        assert_eq!(question, "AAPL 5주를 200달러에 매수해줘");
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_on_failure() {
        let mock = Arc::new(MockProvider::new());
        mock.set_fail_completions(true);
        let synthesizer = QuestionSynthesizer::new(mock);

        let question = synthesizer
            .synthesize("AAPL 10주 매수해줘", "5주만 사줘")
            .await;
        assert_eq!(question, "5주만 사줘");
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_on_empty() {
        let mock = Arc::new(MockProvider::new());
        mock.add_text_response("   ");
        let synthesizer = QuestionSynthesizer::new(mock);

        let question = synthesizer.synthesize("원래 질문", "수정 지시").await;
        assert_eq!(question, "수정 지시");
    }
}
