//! Financial term explanation tool
//!
//! Retrieval over a bundled glossary of Korean finance terms feeds a
//! constrained LLM answer, keeping explanations anchored to the reference
//! definitions instead of free association.

use crate::error::{Error, Result};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use midas_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use std::time::Instant;

const EXPLAIN_SYSTEM_PROMPT: &str = "당신은 경제금융 용어를 쉽게 풀어 설명하는 어시스턴트입니다. \
제공된 참고 정의를 근거로, 일상적인 예시를 곁들여 한국어로 간결하게 설명하세요. \
참고 정의에 없는 내용은 추측하지 말고 일반 상식 수준에서만 보충하세요.";

/// Bundled glossary entries: (term, reference definition).
const GLOSSARY: &[(&str, &str)] = &[
    (
        "기준금리",
        "중앙은행이 금융기관과 거래할 때 기준이 되는 정책금리로, 시중금리 전반에 영향을 준다.",
    ),
    (
        "금리",
        "돈을 빌린 대가로 지급하는 이자의 원금 대비 비율.",
    ),
    (
        "환율",
        "두 나라 화폐 사이의 교환 비율. 원/달러 환율이 오르면 원화 가치가 하락한 것이다.",
    ),
    (
        "인플레이션",
        "물가가 지속적으로 상승하여 화폐의 구매력이 떨어지는 현상.",
    ),
    (
        "양적완화",
        "중앙은행이 국채 등 자산을 대규모로 매입해 시중에 유동성을 공급하는 통화정책.",
    ),
    (
        "채권",
        "정부나 기업이 자금을 빌리며 발행하는 차용증서로, 만기와 표면금리가 정해져 있다.",
    ),
    (
        "ETF",
        "특정 지수나 자산의 수익률을 추종하도록 설계되어 거래소에서 주식처럼 매매되는 펀드.",
    ),
    (
        "공매도",
        "주가 하락을 예상하고 빌린 주식을 먼저 판 뒤 나중에 되사서 갚는 투자 기법.",
    ),
    (
        "PER",
        "주가수익비율. 주가를 주당순이익으로 나눈 값으로, 이익 대비 주가 수준을 나타낸다.",
    ),
    (
        "PBR",
        "주가순자산비율. 주가를 주당순자산으로 나눈 값으로, 장부가치 대비 주가 수준을 나타낸다.",
    ),
    (
        "배당",
        "기업이 벌어들인 이익의 일부를 주주에게 나누어 주는 것.",
    ),
    (
        "유동성",
        "자산을 손실 없이 현금으로 바꿀 수 있는 정도, 또는 시중에 풀린 자금의 양.",
    ),
    (
        "코스피",
        "한국거래소 유가증권시장에 상장된 종목들의 시가총액 가중 주가지수.",
    ),
    (
        "선물",
        "미래의 정해진 시점에 정해진 가격으로 기초자산을 사고팔기로 약속하는 표준화된 계약.",
    ),
    (
        "옵션",
        "정해진 가격에 기초자산을 사거나 팔 수 있는 권리를 거래하는 파생상품.",
    ),
];

/// Score a glossary entry against the query. Substring hits dominate,
/// shared 2-char windows cover inflected Korean phrasing.
fn score(query: &str, term: &str) -> usize {
    let q = query.to_lowercase();
    let t = term.to_lowercase();
    if q.contains(&t) || t.contains(&q) {
        return 100 + t.chars().count();
    }

    let q_chars: Vec<char> = q.chars().collect();
    let t_chars: Vec<char> = t.chars().collect();
    let mut hits = 0;
    for window in t_chars.windows(2) {
        if q_chars.windows(2).any(|qw| qw == window) {
            hits += 1;
        }
    }
    hits
}

fn retrieve(query: &str, limit: usize) -> Vec<(&'static str, &'static str)> {
    let mut scored: Vec<(usize, (&str, &str))> = GLOSSARY
        .iter()
        .map(|(term, def)| (score(query, term), (*term, *def)))
        .filter(|(s, _)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, e)| e).collect()
}

/// Explains a financial term using the bundled glossary.
pub struct TermExplainTool {
    definition: ToolDefinition,
    provider: Arc<dyn LlmProvider>,
}

impl TermExplainTool {
    /// Create the tool.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let definition = ToolDefinition::new(
            "explain_financial_term",
            "경제/금융 용어를 참고 사전 정의를 바탕으로 쉽게 설명합니다.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "term": {
                    "type": "string",
                    "description": "설명할 용어 (예: '기준금리', 'PER')"
                }
            },
            "required": ["term"]
        }));
        Self {
            definition,
            provider,
        }
    }
}

#[async_trait::async_trait]
impl Tool for TermExplainTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        input
            .get("term")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|_| ())
            .ok_or_else(|| Error::InvalidInput("term is required".to_string()))
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let term = input
            .get("term")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim();

        let references = retrieve(term, 3);
        let context = if references.is_empty() {
            "(참고 정의 없음)".to_string()
        } else {
            references
                .iter()
                .map(|(t, d)| format!("- {t}: {d}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let request = CompletionRequest::new(self.provider.default_model())
            .with_message(Message::system(EXPLAIN_SYSTEM_PROMPT))
            .with_message(Message::user(format!(
                "용어: {term}\n\n참고 정의:\n{context}"
            )))
            .with_max_tokens(600)
            .with_temperature(0.3);

        match self.provider.complete(request).await {
            Ok(response) => Ok(ToolResult::success(
                serde_json::json!({
                    "term": term,
                    "explanation": response.content,
                    "references": references
                        .iter()
                        .map(|(t, _)| *t)
                        .collect::<Vec<_>>(),
                }),
                start.elapsed().as_millis() as u64,
            )),
            Err(e) => Ok(ToolResult::failure(
                format!("❌ 용어 설명 생성에 실패했습니다: {e}"),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midas_llm::MockProvider;

    #[test]
    fn test_retrieve_exact_term() {
        let hits = retrieve("기준금리", 3);
        assert_eq!(hits[0].0, "기준금리");
    }

    #[test]
    fn test_retrieve_phrase_containing_term() {
        let hits = retrieve("기준금리가 오르면 어떻게 되나요", 3);
        assert!(hits.iter().any(|(t, _)| *t == "기준금리"));
    }

    #[test]
    fn test_retrieve_unknown_term() {
        assert!(retrieve("zzzz", 3).is_empty());
    }

    #[tokio::test]
    async fn test_explain_includes_references() {
        let mock = Arc::new(MockProvider::new());
        mock.add_text_response("기준금리는 중앙은행이 정하는 정책금리입니다.");
        let provider: Arc<dyn LlmProvider> = mock;

        let tool = TermExplainTool::new(provider);
        let result = tool
            .execute(serde_json::json!({"term": "기준금리"}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output["references"][0], "기준금리");
    }
}
