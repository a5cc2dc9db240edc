//! Orchestrator configuration

use crate::planner::PlannerConfig;
use midas_tools::RunnerConfig;

/// Disclaimer prepended to answers produced without tool evidence.
pub const DEFAULT_DISCLAIMER: &str = "저는 주식 조언 AI입니다. 요청하신 질문은 제 전문 분야가 \
아니므로, 답변의 정확성이 떨어질 수 있다는 점 참고해주세요.\n\n";

/// Policy for the off-domain disclaimer.
#[derive(Debug, Clone)]
pub struct DisclaimerPolicy {
    /// Whether the disclaimer is applied at all
    pub enabled: bool,
    /// The disclaimer text
    pub text: String,
}

impl Default for DisclaimerPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            text: DEFAULT_DISCLAIMER.to_string(),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum planning iterations per turn
    pub max_iterations: usize,
    /// Approval window for pending proposals, in seconds
    pub decision_timeout_secs: i64,
    /// Planner configuration
    pub planner_config: PlannerConfig,
    /// Tool runner configuration
    pub runner_config: RunnerConfig,
    /// Disclaimer policy for answers without tool evidence
    pub disclaimer: DisclaimerPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            decision_timeout_secs: 300,
            planner_config: PlannerConfig::default(),
            runner_config: RunnerConfig::default(),
            disclaimer: DisclaimerPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the maximum planning iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the decision timeout.
    #[must_use]
    pub fn with_decision_timeout(mut self, timeout_secs: i64) -> Self {
        self.decision_timeout_secs = timeout_secs;
        self
    }

    /// Set the planner configuration.
    #[must_use]
    pub fn with_planner_config(mut self, planner_config: PlannerConfig) -> Self {
        self.planner_config = planner_config;
        self
    }

    /// Set the runner configuration.
    #[must_use]
    pub fn with_runner_config(mut self, runner_config: RunnerConfig) -> Self {
        self.runner_config = runner_config;
        self
    }

    /// Set the disclaimer policy.
    #[must_use]
    pub fn with_disclaimer(mut self, disclaimer: DisclaimerPolicy) -> Self {
        self.disclaimer = disclaimer;
        self
    }
}
