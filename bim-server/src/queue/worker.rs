//! Handler Registry & Worker: drains the processing queue and
//! dispatches each job to the handler registered for its `job_type`,
//! following a dequeue/dedup/dispatch algorithm.
//! Concurrency is bounded by a `Semaphore`, mirroring
//! `r2e_events::local::LocalEventBus`'s bounded fan-out; shutdown is
//! cooperative via a `CancellationToken`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::idempotency::IdempotencyTracker;
use super::{JobEnvelope, JobQueueReceiver};
use crate::error::AppError;

#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobEnvelope) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(job_type.into(), handler);
    }

    fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }
}

/// Drains `receiver` until the channel closes or `shutdown` fires,
/// dispatching up to `max_concurrency` jobs at a time. Implements spec
/// §4.10 step by step:
/// 1. dequeue; no-envelope exits the loop.
/// 2. a job already `Completed` is ack'd and skipped.
/// 3. `tryMarkAsProcessing` claims the job; losing the race skips it too.
/// 4. an unregistered `job_type` is marked `Failed` and dropped.
/// 5/6/7. the handler runs in its own task; success marks `Completed`,
///    failure marks `Failed` — both are logged, neither panics the worker.
pub async fn run_worker(
    mut receiver: JobQueueReceiver,
    registry: Arc<HandlerRegistry>,
    idempotency: IdempotencyTracker,
    max_concurrency: usize,
    shutdown: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    info!(max_concurrency, "processing worker started");

    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("processing worker received shutdown signal");
                break;
            }
            job = receiver.recv() => match job {
                Some(job) => job,
                None => {
                    info!("processing queue closed, worker exiting");
                    break;
                }
            },
        };

        if idempotency.is_completed(job.id) {
            info!(job_id = %job.id, "duplicate envelope for an already-completed job, acking without reprocessing");
            continue;
        }
        if !idempotency.try_mark_as_processing(job.id) {
            warn!(job_id = %job.id, "duplicate envelope for an in-flight job, acking without reprocessing");
            continue;
        }

        let Some(handler) = registry.get(&job.job_type) else {
            warn!(job_type = %job.job_type, job_id = %job.id, "no handler registered for job type");
            idempotency.mark_as_failed(job.id);
            continue;
        };

        let permit = semaphore.clone().acquire_owned().await.expect("semaphore is never closed");
        let idempotency = idempotency.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let job_id = job.id;
            match handler.handle(&job).await {
                Ok(()) => idempotency.mark_as_completed(job_id),
                Err(err) => {
                    error!(job_id = %job_id, error = %err, "job handler failed");
                    idempotency.mark_as_failed(job_id);
                }
            }
        });
    }

    let _ = semaphore.acquire_many(max_concurrency as u32).await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::queue::channel;

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _job: &JobEnvelope) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_envelope_runs_handler_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register("noop", Arc::new(CountingHandler { calls: calls.clone() }));

        let (handle, receiver) = channel(8);
        let job_id = Uuid::new_v4();
        let envelope = JobEnvelope::with_id(job_id, "noop", json!({}));
        handle.enqueue(envelope.clone()).await.unwrap();
        handle.enqueue(envelope).await.unwrap();
        drop(handle);

        run_worker(receiver, Arc::new(registry), IdempotencyTracker::new(), 2, CancellationToken::new()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
