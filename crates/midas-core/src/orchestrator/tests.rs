//! Orchestrator scenario tests
//!
//! These drive full turns through the mock provider and stub tools:
//! suspension behind the decision gate, approve/modify/reject flows,
//! replay defense, expiry, and checkpoint resume.

use super::*;
use crate::error::Error;
use crate::proposal::Decision;
use crate::recorder::MemoryTurnRecorder;
use crate::thread::{MemoryThreadStore, ThreadStore};
use midas_llm::{LlmProvider, MessageRole, MockProvider, ToolCall};
use midas_tools::{Tool, ToolDefinition, ToolRegistry, ToolResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct PriceStub {
    definition: ToolDefinition,
    executions: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Tool for PriceStub {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> midas_tools::Result<ToolResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::success(
            serde_json::json!({"symbol": "AAPL", "price": 231.5}),
            5,
        ))
    }
}

struct BrokenAdviceStub {
    definition: ToolDefinition,
}

#[async_trait::async_trait]
impl Tool for BrokenAdviceStub {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> midas_tools::Result<ToolResult> {
        Err(midas_tools::Error::Execution(
            "advice backend unavailable".to_string(),
        ))
    }
}

struct Harness {
    mock: Arc<MockProvider>,
    store: Arc<MemoryThreadStore>,
    recorder: Arc<MemoryTurnRecorder>,
    executions: Arc<AtomicUsize>,
    orchestrator: Orchestrator,
}

fn harness_with_config(config: OrchestratorConfig) -> Harness {
    let mock = Arc::new(MockProvider::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(PriceStub {
        definition: ToolDefinition::new("get_stock_price", "주가 조회"),
        executions: Arc::clone(&executions),
    }));
    registry.register(Arc::new(BrokenAdviceStub {
        definition: ToolDefinition::new("get_stock_advice", "종목 조언"),
    }));

    let store = Arc::new(MemoryThreadStore::new());
    let recorder = Arc::new(MemoryTurnRecorder::new());
    let orchestrator = Orchestrator::new(
        Arc::clone(&mock) as Arc<dyn LlmProvider>,
        Arc::new(registry),
        Arc::clone(&store) as Arc<dyn ThreadStore>,
        config,
    )
    .with_recorder(Arc::clone(&recorder) as Arc<dyn crate::recorder::TurnRecorder>);

    Harness {
        mock,
        store,
        recorder,
        executions,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with_config(OrchestratorConfig::default())
}

fn price_call(id: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: "get_stock_price".to_string(),
        arguments: r#"{"name_or_symbol": "AAPL"}"#.to_string(),
    }
}

#[tokio::test]
async fn test_message_suspends_without_executing() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let result = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();

    let proposal = result.proposal().expect("turn should suspend");
    assert_eq!(proposal.call.name, "get_stock_price");
    assert_eq!(h.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_approve_executes_and_answers() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    h.mock.add_final_answer("AAPL 현재 주가는 231.5달러입니다.");
    let result = h
        .orchestrator
        .handle_decision("thread-1", proposal.id, proposal.nonce, Decision::Approve)
        .await
        .unwrap();

    assert_eq!(h.executions.load(Ordering::SeqCst), 1);
    let answer = result.answer().unwrap();
    assert!(answer.contains("231.5"));
    // Grounded in a tool result, so no disclaimer prefix.
    assert!(!answer.starts_with(DEFAULT_DISCLAIMER));

    match result {
        TurnResult::Final { tool_calls, .. } => {
            assert_eq!(tool_calls.len(), 1);
            assert!(tool_calls[0].success);
            assert_eq!(tool_calls[0].tool_name, "get_stock_price");
        }
        TurnResult::AwaitingDecision { .. } => panic!("expected a final answer"),
    }
}

#[tokio::test]
async fn test_decision_replay_conflicts() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    h.mock.add_final_answer("231.5달러입니다.");
    h.orchestrator
        .handle_decision("thread-1", proposal.id, proposal.nonce, Decision::Approve)
        .await
        .unwrap();

    let err = h
        .orchestrator
        .handle_decision("thread-1", proposal.id, proposal.nonce, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DecisionConflict(_)));
    assert_eq!(h.executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_nonce_mismatch_conflicts() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    let err = h
        .orchestrator
        .handle_decision(
            "thread-1",
            proposal.id,
            uuid::Uuid::new_v4(),
            Decision::Approve,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DecisionConflict(_)));
    assert_eq!(h.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_message_while_pending_conflicts() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    h.orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();

    let err = h
        .orchestrator
        .handle_message("thread-1", "아 그리고 TSLA도")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DecisionConflict(_)));
}

#[tokio::test]
async fn test_reject_appends_one_corrective_pair_and_replans() {
    let h = harness();
    h.mock.add_tool_calls(vec![ToolCall {
        id: "call_1".to_string(),
        name: "get_stock_price".to_string(),
        arguments: r#"{"name_or_symbol": "TSLA"}"#.to_string(),
    }]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "TSLA 주가 알려줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    // Synthesizer output, then the replanned proposal.
    h.mock.add_text_response("AAPL 주가를 알려줘");
    h.mock.add_tool_calls(vec![price_call("call_2")]);

    let result = h
        .orchestrator
        .handle_decision(
            "thread-1",
            proposal.id,
            proposal.nonce,
            Decision::Reject {
                text: "AAPL로 바꿔줘".to_string(),
            },
        )
        .await
        .unwrap();

    let replanned = result.proposal().expect("rejection should replan");
    assert_eq!(replanned.call.id, "call_2");
    assert_eq!(replanned.question, "AAPL 주가를 알려줘");
    assert_eq!(h.executions.load(Ordering::SeqCst), 0);

    let ctx = h.store.get("thread-1").await.unwrap().unwrap();
    // user, assistant(call_1), tool(corrective), user(correction), assistant(call_2)
    assert_eq!(ctx.message_count(), 5);
    assert_eq!(ctx.messages[2].role, MessageRole::Tool);
    assert!(ctx.messages[2].content.contains("이전 계획은 무시"));
    assert_eq!(ctx.messages[3].role, MessageRole::User);
    assert_eq!(ctx.messages[3].content, "AAPL로 바꿔줘");

    // Approving the re-proposal executes exactly once.
    let replanned = replanned.clone();
    h.mock.add_final_answer("AAPL 현재 주가는 231.5달러입니다.");
    let final_result = h
        .orchestrator
        .handle_decision("thread-1", replanned.id, replanned.nonce, Decision::Approve)
        .await
        .unwrap();
    assert!(final_result.is_final());
    assert_eq!(h.executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_modify_uses_synthesized_question() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 10주 매수해줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    // Synthesis fails, so the raw correction becomes the question.
    h.mock.set_fail_completions(true);
    h.mock.add_tool_calls(vec![price_call("call_2")]);

    let result = h
        .orchestrator
        .handle_decision(
            "thread-1",
            proposal.id,
            proposal.nonce,
            Decision::Modify {
                text: "5주만 사줘".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(result.proposal().unwrap().question, "5주만 사줘");
}

#[tokio::test]
async fn test_checkpoint_resumes_across_restart() {
    let h = harness();
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    let checkpoint = h.store.get("thread-1").await.unwrap().unwrap();
    let saved = checkpoint.pending.as_ref().expect("checkpoint holds the proposal");
    assert_eq!(saved.id, proposal.id);
    assert_eq!(saved.nonce, proposal.nonce);

    // Fresh orchestrator over the same store stands in for a restart.
    let mock2 = Arc::new(MockProvider::new());
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(PriceStub {
        definition: ToolDefinition::new("get_stock_price", "주가 조회"),
        executions: Arc::clone(&h.executions),
    }));
    let restarted = Orchestrator::new(
        Arc::clone(&mock2) as Arc<dyn LlmProvider>,
        Arc::new(registry),
        Arc::clone(&h.store) as Arc<dyn ThreadStore>,
        OrchestratorConfig::default(),
    );

    mock2.add_final_answer("231.5달러입니다.");
    let result = restarted
        .handle_decision("thread-1", proposal.id, proposal.nonce, Decision::Approve)
        .await
        .unwrap();
    assert!(result.is_final());
    assert_eq!(h.executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expired_proposal_rejected_on_decision() {
    let h = harness_with_config(OrchestratorConfig::default().with_decision_timeout(-1));
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    let err = h
        .orchestrator
        .handle_decision("thread-1", proposal.id, proposal.nonce, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProposalExpired));
    assert_eq!(h.executions.load(Ordering::SeqCst), 0);

    // The discarded plan no longer blocks new messages.
    h.mock.add_final_answer("네, 무엇을 도와드릴까요?");
    let result = h
        .orchestrator
        .handle_message("thread-1", "안녕")
        .await
        .unwrap();
    assert!(result.is_final());
}

#[tokio::test]
async fn test_expired_proposal_discarded_on_new_message() {
    let h = harness_with_config(OrchestratorConfig::default().with_decision_timeout(-1));
    h.mock.add_tool_calls(vec![price_call("call_1")]);

    h.orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap();

    h.mock.add_final_answer("다시 질문해 주세요.");
    let result = h
        .orchestrator
        .handle_message("thread-1", "그래서 얼마야?")
        .await
        .unwrap();
    assert!(result.is_final());

    let ctx = h.store.get("thread-1").await.unwrap().unwrap();
    assert!(ctx.pending.is_none());
    assert!(ctx
        .messages
        .iter()
        .any(|m| m.role == MessageRole::Tool && m.content.contains("만료")));
}

#[tokio::test]
async fn test_direct_answer_carries_disclaimer() {
    let h = harness();
    h.mock.add_final_answer("서울의 수도는 질문이 이상하네요.");

    let result = h
        .orchestrator
        .handle_message("thread-1", "서울 날씨 어때?")
        .await
        .unwrap();
    assert!(result.answer().unwrap().starts_with(DEFAULT_DISCLAIMER));
}

#[tokio::test]
async fn test_extra_tool_calls_discarded() {
    let h = harness();
    h.mock.add_tool_calls(vec![
        price_call("call_1"),
        ToolCall {
            id: "call_2".to_string(),
            name: "get_stock_advice".to_string(),
            arguments: r#"{"symbol": "AAPL"}"#.to_string(),
        },
    ]);

    let result = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가랑 조언 둘 다")
        .await
        .unwrap();

    assert_eq!(result.proposal().unwrap().call.id, "call_1");

    let ctx = h.store.get("thread-1").await.unwrap().unwrap();
    let discarded = ctx
        .messages
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("call_2"))
        .expect("extra call gets a response");
    assert!(discarded.content.contains("보류"));
}

#[tokio::test]
async fn test_unknown_tool_fails_but_keeps_checkpoint() {
    let h = harness();
    h.mock.add_tool_calls(vec![ToolCall {
        id: "call_1".to_string(),
        name: "delete_account".to_string(),
        arguments: "{}".to_string(),
    }]);

    let err = h
        .orchestrator
        .handle_message("thread-1", "계좌 삭제해줘")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTool(name) if name == "delete_account"));

    let ctx = h.store.get("thread-1").await.unwrap().unwrap();
    assert!(ctx.pending.is_none());
    assert!(ctx
        .messages
        .iter()
        .any(|m| m.role == MessageRole::Tool && m.content.contains("알 수 없는 도구")));
}

#[tokio::test]
async fn test_capability_failure_folds_into_conversation() {
    let h = harness();
    h.mock.add_tool_calls(vec![ToolCall {
        id: "call_1".to_string(),
        name: "get_stock_advice".to_string(),
        arguments: r#"{"symbol": "AAPL"}"#.to_string(),
    }]);

    let suspended = h
        .orchestrator
        .handle_message("thread-1", "AAPL 조언해줘")
        .await
        .unwrap();
    let proposal = suspended.proposal().unwrap().clone();

    h.mock
        .add_final_answer("조언 서비스에 문제가 있어 답변을 드리지 못했습니다.");
    let result = h
        .orchestrator
        .handle_decision("thread-1", proposal.id, proposal.nonce, Decision::Approve)
        .await
        .unwrap();

    assert!(result.is_final());
    match &result {
        TurnResult::Final { tool_calls, .. } => {
            assert!(!tool_calls[0].success);
            assert!(tool_calls[0].output["error"]
                .as_str()
                .unwrap()
                .contains("advice backend unavailable"));
        }
        TurnResult::AwaitingDecision { .. } => panic!("expected a final answer"),
    }

    let ctx = h.store.get("thread-1").await.unwrap().unwrap();
    let folded = ctx
        .messages
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("call_1"))
        .unwrap();
    assert!(folded.content.contains("advice backend unavailable"));
}

#[tokio::test]
async fn test_completed_turn_is_recorded() {
    let h = harness();
    h.mock.add_final_answer("금리는 돈을 빌린 대가입니다.");

    h.orchestrator
        .handle_message("thread-1", "금리가 뭐야?")
        .await
        .unwrap();

    for _ in 0..50 {
        if !h.recorder.recorded().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let records = h.recorder.recorded();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].question, "금리가 뭐야?");
}

#[tokio::test]
async fn test_iteration_limit_fails_planning() {
    let h = harness_with_config(OrchestratorConfig::default().with_max_iterations(0));
    let err = h
        .orchestrator
        .handle_message("thread-1", "AAPL 주가 알려줘")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Planning(_)));
}
