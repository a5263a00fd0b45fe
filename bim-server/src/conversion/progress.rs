//! Progress Notifier: best-effort fan-out of conversion progress
//! events. Trimmed down from `r2e_events::local::LocalEventBus`'s generic
//! TypeId-keyed pub/sub to a single event shape, since this pipeline only
//! ever emits one kind of event. A sink failure never fails the job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingProgress {
    pub job_id: Uuid,
    pub model_version_id: Uuid,
    pub stage: &'static str,
    pub percent_complete: u8,
    pub message: String,
    pub is_complete: bool,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingProgress {
    pub fn stage(job_id: Uuid, model_version_id: Uuid, stage: &'static str, percent_complete: u8, message: impl Into<String>) -> Self {
        Self {
            job_id,
            model_version_id,
            stage,
            percent_complete,
            message: message.into(),
            is_complete: false,
            is_success: false,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn success(job_id: Uuid, model_version_id: Uuid) -> Self {
        Self {
            job_id,
            model_version_id,
            stage: "Complete",
            percent_complete: 100,
            message: "conversion complete".into(),
            is_complete: true,
            is_success: true,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(job_id: Uuid, model_version_id: Uuid, error_message: impl Into<String>) -> Self {
        Self {
            job_id,
            model_version_id,
            stage: "Complete",
            percent_complete: 100,
            message: "conversion failed".into(),
            is_complete: true,
            is_success: false,
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, progress: &ProcessingProgress);
}

/// Default sink: structured logging, matching the rest of the crate's
/// `tracing` usage.
pub struct LoggingProgressSink;

#[async_trait::async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn notify(&self, progress: &ProcessingProgress) {
        if progress.is_complete && !progress.is_success {
            warn!(
                job_id = %progress.job_id,
                model_version_id = %progress.model_version_id,
                error = ?progress.error_message,
                "conversion failed"
            );
        } else {
            info!(
                job_id = %progress.job_id,
                model_version_id = %progress.model_version_id,
                stage = progress.stage,
                percent = progress.percent_complete,
                "{}",
                progress.message
            );
        }
    }
}

#[derive(Clone)]
pub struct ProgressNotifier {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl Default for ProgressNotifier {
    fn default() -> Self {
        Self { sinks: vec![Arc::new(LoggingProgressSink)] }
    }
}

impl ProgressNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Webhook/push-channel sinks attach here without touching the
    /// orchestrator that calls `publish`.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub async fn publish(&self, progress: ProcessingProgress) {
        for sink in &self.sinks {
            sink.notify(&progress).await;
        }
    }
}
