//! Processing Queue: an in-process channel of conversion jobs consumed
//! by the worker (`queue::worker`). Uses the same bounded-channel idiom
//! for backpressure as `tokio::sync::mpsc` elsewhere in this codebase,
//! rather than a durable broker — multi-node job distribution is out of
//! scope for this service.

pub mod idempotency;
pub mod worker;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;

/// One unit of work on the queue. `payload` carries handler-specific
/// arguments (e.g. `{"modelVersionId": "..."}`); handlers parse their own
/// shape rather than the queue knowing every job type's fields.
#[derive(Debug, Clone, Serialize)]
pub struct JobEnvelope {
    pub id: Uuid,
    pub job_type: String,
    pub payload: Value,
    pub enqueued_at: DateTime<Utc>,
}

impl JobEnvelope {
    pub fn new(job_type: &str, payload: Value) -> Self {
        Self::with_id(Uuid::new_v4(), job_type, payload)
    }

    /// Builds an envelope whose `id` matches an existing `ProcessingJob`
    /// row, so the worker can report progress against that row without a
    /// second lookup.
    pub fn with_id(id: Uuid, job_type: &str, payload: Value) -> Self {
        Self { id, job_type: job_type.to_string(), payload, enqueued_at: Utc::now() }
    }

    /// The `modelVersionId` field, when this job's payload carries one —
    /// used by the worker as the idempotency dedup key.
    pub fn model_version_id(&self) -> Option<Uuid> {
        self.payload.get("modelVersionId")?.as_str().and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Cloneable handle for enqueuing work; the receiving end stays with
/// whoever runs the worker loop. Wraps either a bounded or an unbounded
/// `tokio::sync::mpsc` sender — bounded applies backpressure to
/// producers once the queue is full, unbounded never blocks `enqueue`.
#[derive(Clone)]
pub enum JobQueueHandle {
    Bounded(mpsc::Sender<JobEnvelope>),
    Unbounded(mpsc::UnboundedSender<JobEnvelope>),
}

impl JobQueueHandle {
    pub async fn enqueue(&self, job: JobEnvelope) -> Result<(), AppError> {
        match self {
            JobQueueHandle::Bounded(sender) => {
                sender.send(job).await.map_err(|_| AppError::Internal("processing queue is closed".into()))
            }
            JobQueueHandle::Unbounded(sender) => {
                sender.send(job).map_err(|_| AppError::Internal("processing queue is closed".into()))
            }
        }
    }
}

/// The receiving half of a job queue, bounded or unbounded depending on
/// how `channel` was constructed.
pub enum JobQueueReceiver {
    Bounded(mpsc::Receiver<JobEnvelope>),
    Unbounded(mpsc::UnboundedReceiver<JobEnvelope>),
}

impl JobQueueReceiver {
    pub async fn recv(&mut self) -> Option<JobEnvelope> {
        match self {
            JobQueueReceiver::Bounded(receiver) => receiver.recv().await,
            JobQueueReceiver::Unbounded(receiver) => receiver.recv().await,
        }
    }
}

/// Creates a job channel. `capacity == 0` selects the unbounded mode
/// (no producer backpressure, e.g. for local/dev runs); any other value
/// creates a bounded channel of that capacity that makes `enqueue`
/// callers wait once the queue is full, per spec §4.8's two modes.
pub fn channel(capacity: usize) -> (JobQueueHandle, JobQueueReceiver) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (JobQueueHandle::Unbounded(tx), JobQueueReceiver::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(capacity);
        (JobQueueHandle::Bounded(tx), JobQueueReceiver::Bounded(rx))
    }
}
