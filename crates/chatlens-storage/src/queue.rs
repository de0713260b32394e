// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed work queue shared by analyzer processes.

use chatlens_core::{AnalysisTask, ChatlensError};
use tracing::{debug, info};

use crate::database::Database;
use crate::queries::queue;

/// Priority queue of (source, day) analysis tasks.
///
/// Several workers may share one database file; dequeue is atomic.
#[derive(Clone)]
pub struct AnalysisQueue {
    db: Database,
}

impl AnalysisQueue {
    pub async fn open(path: &str) -> Result<Self, ChatlensError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    pub async fn enqueue(
        &self,
        source: &str,
        day: &str,
        priority: i64,
        batch_size: Option<usize>,
    ) -> Result<i64, ChatlensError> {
        let source = chatlens_core::normalize_source(source);
        let id = queue::enqueue(&self.db, source, day, priority, batch_size).await?;
        info!(id, source, day, priority, "analysis task queued");
        Ok(id)
    }

    pub async fn dequeue(&self) -> Result<Option<AnalysisTask>, ChatlensError> {
        let task = queue::dequeue(&self.db).await?;
        if let Some(task) = &task {
            debug!(id = task.id, source = %task.source, day = %task.day, "task dequeued");
        }
        Ok(task)
    }

    pub async fn complete(&self, id: i64) -> Result<(), ChatlensError> {
        queue::complete(&self.db, id).await
    }

    pub async fn fail(&self, id: i64, error: &str) -> Result<(), ChatlensError> {
        queue::fail(&self.db, id, error).await
    }

    pub async fn pending(&self) -> Result<Vec<AnalysisTask>, ChatlensError> {
        queue::pending(&self.db).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<AnalysisTask>, ChatlensError> {
        queue::get(&self.db, id).await
    }

    /// Number of pending tasks.
    pub async fn len(&self) -> Result<usize, ChatlensError> {
        queue::len(&self.db).await
    }

    pub async fn is_empty(&self) -> Result<bool, ChatlensError> {
        Ok(self.len().await? == 0)
    }

    pub async fn close(self) -> Result<(), ChatlensError> {
        self.db.close().await
    }
}
