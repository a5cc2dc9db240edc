//! Orchestrator construction and shared state

use crate::event_bus::{EventBus, TurnEvent};
use crate::orchestrator::OrchestratorConfig;
use crate::planner::Planner;
use crate::recorder::TurnRecorder;
use crate::synthesizer::QuestionSynthesizer;
use crate::thread::ThreadStore;
use dashmap::DashMap;
use midas_llm::LlmProvider;
use midas_tools::{ToolRegistry, ToolRunner};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The turn engine.
///
/// Clone-cheap handles only; the orchestrator itself is shared behind an
/// `Arc` by callers that serve multiple threads.
pub struct Orchestrator {
    pub(crate) planner: Planner,
    pub(crate) runner: ToolRunner,
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) threads: Arc<dyn ThreadStore>,
    pub(crate) synthesizer: QuestionSynthesizer,
    pub(crate) recorder: Option<Arc<dyn TurnRecorder>>,
    pub(crate) event_bus: Option<EventBus>,
    pub(crate) config: OrchestratorConfig,
    // One async mutex per thread serializes turns on that thread.
    thread_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        threads: Arc<dyn ThreadStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let planner = Planner::new(Arc::clone(&provider), config.planner_config.clone());
        let runner = ToolRunner::new(Arc::clone(&registry), config.runner_config.clone());
        let synthesizer = QuestionSynthesizer::new(provider);
        Self {
            planner,
            runner,
            registry,
            threads,
            synthesizer,
            recorder: None,
            event_bus: None,
            config,
            thread_locks: DashMap::new(),
        }
    }

    /// Attach a turn recorder.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn TurnRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Attach an event bus.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Get the tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub(crate) fn emit(&self, event: TurnEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Acquire the per-thread turn lock.
    pub(crate) async fn lock_thread(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .thread_locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
