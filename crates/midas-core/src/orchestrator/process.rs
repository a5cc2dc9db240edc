//! Message handling and the planning loop

use crate::error::{Error, Result};
use crate::event_bus::TurnEvent;
use crate::orchestrator::types::{ToolCallRecord, TurnResult};
use crate::orchestrator::Orchestrator;
use crate::proposal::PendingProposal;
use crate::recorder::spawn_record;
use crate::thread::ThreadContext;
use midas_llm::MessageRole;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Tool response attached to proposal calls beyond the first. Single-call
/// policy: only the first proposal is put before the user.
pub(crate) const DISCARD_NOTICE: &str =
    "이 도구 호출은 보류되었습니다. 한 번에 하나의 도구만 검토 대상이 됩니다.";

/// Tool response attached to a proposal whose approval window elapsed.
pub(crate) const EXPIRED_NOTICE: &str = "승인 시간이 만료되어 이전 계획이 취소되었습니다.";

const EMPTY_ANSWER_FALLBACK: &str = "죄송합니다, 답변을 생성하지 못했습니다.";

impl Orchestrator {
    /// Process a user message on a thread.
    ///
    /// Returns the final answer, or suspends with a proposal awaiting a
    /// decision. A message on a thread with a live pending proposal is a
    /// [`Error::DecisionConflict`]; an expired proposal is discarded
    /// first and the message proceeds.
    #[instrument(skip(self, text), fields(thread_id = %thread_id))]
    pub async fn handle_message(&self, thread_id: &str, text: &str) -> Result<TurnResult> {
        let _turn_guard = self.lock_thread(thread_id).await;

        let turn_id = Uuid::new_v4();
        self.emit(TurnEvent::TurnStarted {
            turn_id,
            thread_id: thread_id.to_string(),
        });

        let mut ctx = self
            .threads
            .get(thread_id)
            .await?
            .unwrap_or_else(|| ThreadContext::new(thread_id));

        if let Some(pending) = ctx.pending.clone() {
            if pending.is_expired() {
                warn!(proposal_id = %pending.id, "Discarding expired proposal on new message");
                ctx.add_tool_result(&pending.call.id, EXPIRED_NOTICE)?;
                ctx.pending = None;
            } else {
                return self.fail_turn(
                    turn_id,
                    Error::DecisionConflict(format!(
                        "thread '{thread_id}' is awaiting a decision on proposal {}",
                        pending.id
                    )),
                );
            }
        }

        ctx.add_user_message(text);

        let outcome = self
            .run_planning_loop(turn_id, &mut ctx, text, Vec::new())
            .await;
        self.finish_turn(turn_id, ctx, outcome).await
    }

    /// Run planning until a final answer or a tool proposal.
    ///
    /// `records` carries tool executions already performed in this entry
    /// point call (the resume path) so they appear in the final result.
    pub(crate) async fn run_planning_loop(
        &self,
        turn_id: Uuid,
        ctx: &mut ThreadContext,
        question: &str,
        records: Vec<ToolCallRecord>,
    ) -> Result<TurnResult> {
        let tools = self.registry.to_llm_tools();

        for iteration in 1..=self.config.max_iterations {
            self.emit(TurnEvent::PlanningStarted { turn_id, iteration });

            let plan = self.planner.plan_step(&ctx.messages, &tools).await?;

            if !plan.has_tool_calls() {
                let mut answer = plan
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| EMPTY_ANSWER_FALLBACK.to_string());

                // Answers grounded in a tool result skip the disclaimer.
                let grounded = ctx.last_role() == Some(MessageRole::Tool);
                if self.config.disclaimer.enabled && !grounded {
                    answer = format!("{}{}", self.config.disclaimer.text, answer);
                }

                ctx.add_assistant_message(&answer);
                if let Some(recorder) = &self.recorder {
                    spawn_record(recorder.clone(), &ctx.thread_id, question, &answer);
                }
                info!(iterations = iteration, "Turn produced final answer");
                return Ok(TurnResult::Final {
                    turn_id,
                    answer,
                    tool_calls: records,
                    iterations: iteration,
                });
            }

            let calls = plan.tool_calls;
            let proposed = calls[0].clone();
            ctx.add_assistant_tool_calls(plan.content.unwrap_or_default(), calls.clone());

            // Keep the wire format replayable: every extra call gets a
            // response before the turn suspends.
            for extra in &calls[1..] {
                ctx.add_tool_result(&extra.id, DISCARD_NOTICE)?;
            }

            if !self.registry.has(&proposed.name) {
                ctx.add_tool_result(
                    &proposed.id,
                    format!("오류: 알 수 없는 도구 '{}'", proposed.name),
                )?;
                return Err(Error::UnknownTool(proposed.name));
            }

            let proposal = PendingProposal::new(
                &ctx.thread_id,
                question,
                proposed,
                self.config.decision_timeout_secs,
            );
            self.emit(TurnEvent::DecisionRequired {
                turn_id,
                proposal_id: proposal.id,
                tool_name: proposal.call.name.clone(),
            });
            info!(
                proposal_id = %proposal.id,
                tool = %proposal.call.name,
                "Turn suspended awaiting decision"
            );
            ctx.pending = Some(proposal.clone());
            return Ok(TurnResult::AwaitingDecision { turn_id, proposal });
        }

        Err(Error::Planning(format!(
            "no final answer after {} iterations",
            self.config.max_iterations
        )))
    }

    /// Persist the thread and emit the terminal event for this call.
    ///
    /// The checkpoint is written on success and on failure alike, so a
    /// structural error never loses conversation state. A persistence
    /// failure outranks a successful outcome but not an earlier error.
    pub(crate) async fn finish_turn(
        &self,
        turn_id: Uuid,
        ctx: ThreadContext,
        outcome: Result<TurnResult>,
    ) -> Result<TurnResult> {
        let saved = self.threads.save(&ctx).await;

        match (outcome, saved) {
            (Ok(result), Ok(())) => {
                if result.is_final() {
                    self.emit(TurnEvent::TurnCompleted {
                        turn_id,
                        thread_id: ctx.thread_id.clone(),
                    });
                }
                Ok(result)
            }
            (Ok(_), Err(e)) => self.fail_turn(turn_id, e),
            (Err(e), Ok(())) => self.fail_turn(turn_id, e),
            (Err(e), Err(save_err)) => {
                warn!(error = %save_err, "Checkpoint save failed while handling turn error");
                self.fail_turn(turn_id, e)
            }
        }
    }

    pub(crate) fn fail_turn(&self, turn_id: Uuid, error: Error) -> Result<TurnResult> {
        self.emit(TurnEvent::TurnFailed {
            turn_id,
            error: error.to_string(),
        });
        Err(error)
    }
}
