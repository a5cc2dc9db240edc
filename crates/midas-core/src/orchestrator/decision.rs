//! Decision handling - resuming a suspended turn
//!
//! Approve executes the proposed call and folds the outcome into the
//! conversation. Modify and reject discard the plan, append exactly one
//! corrective message pair, synthesize a new effective question and
//! replan. Either way the pending proposal is consumed first, so a
//! replayed decision hits a conflict instead of a second execution.

use crate::error::{Error, Result};
use crate::event_bus::TurnEvent;
use crate::orchestrator::process::EXPIRED_NOTICE;
use crate::orchestrator::types::{ToolCallRecord, TurnResult};
use crate::orchestrator::Orchestrator;
use crate::planner::render_tool_output;
use crate::proposal::{Decision, PendingProposal};
use crate::thread::ThreadContext;
use midas_llm::ToolCall;
use tracing::{instrument, warn};
use uuid::Uuid;

impl Orchestrator {
    /// Apply a user decision to the pending proposal on a thread.
    #[instrument(skip(self, decision), fields(thread_id = %thread_id, proposal_id = %proposal_id))]
    pub async fn handle_decision(
        &self,
        thread_id: &str,
        proposal_id: Uuid,
        nonce: Uuid,
        decision: Decision,
    ) -> Result<TurnResult> {
        let _turn_guard = self.lock_thread(thread_id).await;

        let turn_id = Uuid::new_v4();
        self.emit(TurnEvent::TurnStarted {
            turn_id,
            thread_id: thread_id.to_string(),
        });

        let mut ctx = self.threads.get(thread_id).await?.ok_or_else(|| {
            Error::DecisionConflict(format!("no conversation state for thread '{thread_id}'"))
        })?;

        let Some(pending) = ctx.pending.clone() else {
            return self.fail_turn(
                turn_id,
                Error::DecisionConflict("no decision is pending for this thread".to_string()),
            );
        };
        if pending.id != proposal_id {
            return self.fail_turn(
                turn_id,
                Error::DecisionConflict(format!(
                    "decision targets proposal {proposal_id}, pending is {}",
                    pending.id
                )),
            );
        }
        if pending.nonce != nonce {
            return self.fail_turn(
                turn_id,
                Error::DecisionConflict("nonce does not match the pending proposal".to_string()),
            );
        }
        if pending.is_expired() {
            ctx.pending = None;
            ctx.add_tool_result(&pending.call.id, EXPIRED_NOTICE)?;
            let outcome = self.finish_turn(turn_id, ctx, Err(Error::ProposalExpired)).await;
            return outcome;
        }

        // Consume the proposal before acting; a replay now conflicts.
        ctx.pending = None;

        let mut records = Vec::new();
        let question = match &decision {
            Decision::Approve => {
                let record = self.execute_approved(turn_id, &mut ctx, &pending).await?;
                records.push(record);
                pending.question.clone()
            }
            Decision::Modify { text } | Decision::Reject { text } => {
                ctx.add_tool_result(
                    &pending.call.id,
                    format!(
                        "사용자가 이전 계획을 거절하고 새로운 지시를 내렸습니다. \
                         이전 계획은 무시하고 다음 지시를 따라주세요: '{text}'"
                    ),
                )?;
                ctx.add_user_message(text);
                self.synthesizer.synthesize(&pending.question, text).await
            }
        };

        let outcome = self
            .run_planning_loop(turn_id, &mut ctx, &question, records)
            .await;
        self.finish_turn(turn_id, ctx, outcome).await
    }

    /// Execute an approved tool call and fold the outcome into the
    /// conversation. Capability failures (including timeouts) become
    /// tool-result content the model replans around; only history
    /// violations propagate.
    async fn execute_approved(
        &self,
        turn_id: Uuid,
        ctx: &mut ThreadContext,
        pending: &PendingProposal,
    ) -> Result<ToolCallRecord> {
        let call = &pending.call;
        let input = parse_call_arguments(call);

        self.emit(TurnEvent::ToolStarted {
            turn_id,
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
        });

        let (output, success, duration_ms) = match self.runner.execute(&call.name, input.clone()).await
        {
            Ok(exec) => {
                let result = exec.result;
                let output = if result.success {
                    result.output
                } else {
                    serde_json::json!({
                        "error": result.error.unwrap_or_else(|| "tool failed".to_string())
                    })
                };
                (output, result.success, result.duration_ms)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Approved tool execution failed");
                (serde_json::json!({"error": e.to_string()}), false, 0)
            }
        };

        self.emit(TurnEvent::ToolCompleted {
            turn_id,
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success,
            duration_ms,
        });

        ctx.add_tool_result(&call.id, render_tool_output(&output))?;

        Ok(ToolCallRecord {
            tool_name: call.name.clone(),
            input,
            output,
            success,
            duration_ms,
        })
    }
}

/// Parse tool call arguments, falling back to an empty object on malformed
/// JSON so the tool's own validation produces the user-facing error.
fn parse_call_arguments(call: &ToolCall) -> serde_json::Value {
    serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
        warn!(tool = %call.name, error = %e, "Malformed tool arguments, using empty object");
        serde_json::json!({})
    })
}
