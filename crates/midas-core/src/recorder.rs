//! Turn recorder
//!
//! Completed question/answer pairs can be shipped to an external endpoint
//! for audit. Recording is fire-and-forget: a recorder failure is logged
//! and never affects the turn.

use crate::error::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A recorded turn entry.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    /// Thread the turn belongs to
    pub thread_id: String,
    /// Effective question the turn answered
    pub question: String,
    /// Final answer text
    pub answer: String,
    /// When the record was produced
    pub recorded_at: chrono::DateTime<Utc>,
}

/// Sink for completed turns.
#[async_trait::async_trait]
pub trait TurnRecorder: Send + Sync {
    /// Record one completed turn.
    async fn record(&self, record: TurnRecord) -> Result<()>;
}

/// Posts records as JSON to an HTTP endpoint.
pub struct HttpTurnRecorder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTurnRecorder {
    /// Create a recorder for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl TurnRecorder for HttpTurnRecorder {
    async fn record(&self, record: TurnRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&record)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("recorder request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "recorder endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// In-memory recorder for tests.
#[derive(Default)]
pub struct MemoryTurnRecorder {
    records: Mutex<Vec<TurnRecord>>,
}

impl MemoryTurnRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded turns.
    #[must_use]
    pub fn recorded(&self) -> Vec<TurnRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl TurnRecorder for MemoryTurnRecorder {
    async fn record(&self, record: TurnRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}

/// Record a turn in the background; failures are logged, never propagated.
pub fn spawn_record(
    recorder: Arc<dyn TurnRecorder>,
    thread_id: impl Into<String>,
    question: impl Into<String>,
    answer: impl Into<String>,
) {
    let record = TurnRecord {
        thread_id: thread_id.into(),
        question: question.into(),
        answer: answer.into(),
        recorded_at: Utc::now(),
    };
    tokio::spawn(async move {
        if let Err(e) = recorder.record(record).await {
            warn!(error = %e, "Turn recording failed");
        }
    });
}
