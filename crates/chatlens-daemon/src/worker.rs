// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue-driven analysis.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chatlens_analyzer::AnalyzerService;
use chatlens_config::WorkerConfig;
use chatlens_core::{AnalysisTask, ChatlensError};
use chatlens_storage::AnalysisQueue;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

/// What happened to one dequeued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { id: i64, discussions: usize },
    Failed { id: i64, error: String },
}

/// Drains the analysis queue, one task at a time.
pub struct QueueWorker {
    queue: AnalysisQueue,
    service: Arc<AnalyzerService>,
    poll_interval: Duration,
}

impl QueueWorker {
    pub fn new(queue: AnalysisQueue, service: Arc<AnalyzerService>, config: &WorkerConfig) -> Self {
        Self {
            queue,
            service,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
        }
    }

    /// Processes tasks until `cancel` fires, sleeping while the queue is empty.
    ///
    /// Cancellation is checked between tasks. A queue error is logged and
    /// retried after one poll interval. Returns the number of tasks
    /// processed.
    pub async fn run(&self, cancel: CancellationToken) -> Result<u64, ChatlensError> {
        info!(poll_interval_secs = self.poll_interval.as_secs(), "queue worker started");
        let mut processed = 0;
        while !cancel.is_cancelled() {
            match self.run_once().await {
                Ok(Some(_)) => {
                    processed += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, error_kind = e.kind(), "queue unavailable, retrying");
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!(processed, "queue worker stopped");
        Ok(processed)
    }

    /// Takes the next task, if any, and analyzes it.
    ///
    /// Analysis failures are recorded on the task; only queue errors are
    /// returned.
    pub async fn run_once(&self) -> Result<Option<TaskOutcome>, ChatlensError> {
        let Some(task) = self.queue.dequeue().await? else {
            debug!("queue is empty");
            return Ok(None);
        };

        let span = info_span!(
            "task",
            id = task.id,
            source = %task.source,
            day = %task.day,
            attempt = task.attempts
        );
        let outcome = self.analyze(&task).instrument(span.clone()).await;

        match outcome {
            Ok(discussions) => {
                self.queue.complete(task.id).await?;
                span.in_scope(|| info!(discussions, "task completed"));
                Ok(Some(TaskOutcome::Completed {
                    id: task.id,
                    discussions,
                }))
            }
            Err(e) => {
                let message = e.to_string();
                self.queue.fail(task.id, &message).await?;
                span.in_scope(|| error!(error = %e, error_kind = e.kind(), "task failed"));
                Ok(Some(TaskOutcome::Failed {
                    id: task.id,
                    error: message,
                }))
            }
        }
    }

    async fn analyze(&self, task: &AnalysisTask) -> Result<usize, ChatlensError> {
        let mut options = self.service.default_options().forced();
        if let Some(batch_size) = task.batch_size {
            // A stored batch size of 0 selects window mode.
            options.batch_size = NonZeroUsize::new(batch_size);
        }
        let (result, _) = self
            .service
            .analyze(&task.source, &task.day, options)
            .await?;
        Ok(result.discussions.len())
    }
}
