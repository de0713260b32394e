// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority queue of analysis tasks.
//!
//! Higher priority is dequeued first; equal priorities leave in enqueue
//! order. Dequeue takes the write lock before reading and only claims a row
//! that is still `pending`, so a task is handed out at most once even when
//! several worker processes share the database file.

use std::str::FromStr;

use chatlens_core::{AnalysisTask, ChatlensError, TaskStatus};
use rusqlite::{Row, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, source, day, priority, batch_size, status, attempts,
                       enqueued_at, started_at, finished_at, last_error";

fn task_from_row(row: &Row<'_>) -> Result<AnalysisTask, rusqlite::Error> {
    let status: String = row.get(5)?;
    let status = TaskStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let batch_size: Option<i64> = row.get(4)?;
    Ok(AnalysisTask {
        id: row.get(0)?,
        source: row.get(1)?,
        day: row.get(2)?,
        priority: row.get(3)?,
        batch_size: batch_size.and_then(|n| usize::try_from(n).ok()),
        status,
        attempts: row.get(6)?,
        enqueued_at: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
        last_error: row.get(10)?,
    })
}

/// Enqueue a task, or update the pending task for the same source and day.
///
/// An existing pending task takes the new priority and batch size. Returns
/// the task id.
pub async fn enqueue(
    db: &Database,
    source: &str,
    day: &str,
    priority: i64,
    batch_size: Option<usize>,
) -> Result<i64, ChatlensError> {
    let source = source.to_string();
    let day = day.to_string();
    let batch_size = batch_size.and_then(|n| i64::try_from(n).ok());
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing = tx.query_row(
                "SELECT id FROM analysis_queue
                 WHERE source = ?1 AND day = ?2 AND status = 'pending'",
                params![source, day],
                |row| row.get::<_, i64>(0),
            );
            let id = match existing {
                Ok(id) => {
                    tx.execute(
                        "UPDATE analysis_queue SET priority = ?1, batch_size = ?2 WHERE id = ?3",
                        params![priority, batch_size, id],
                    )?;
                    id
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.execute(
                        "INSERT INTO analysis_queue (source, day, priority, batch_size)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![source, day, priority, batch_size],
                    )?;
                    tx.last_insert_rowid()
                }
                Err(e) => return Err(e),
            };
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Dequeue the highest-priority pending task and mark it `processing`.
///
/// Returns `None` if no task is pending.
pub async fn dequeue(db: &Database) -> Result<Option<AnalysisTask>, ChatlensError> {
    db.connection()
        .call(|conn| -> Result<Option<AnalysisTask>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let result = tx.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM analysis_queue
                     WHERE status = 'pending'
                     ORDER BY priority DESC, id ASC
                     LIMIT 1"
                ),
                [],
                task_from_row,
            );

            match result {
                Ok(task) => {
                    let claimed = tx.execute(
                        "UPDATE analysis_queue SET status = 'processing',
                         attempts = attempts + 1,
                         started_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1 AND status = 'pending'",
                        params![task.id],
                    )?;
                    if claimed == 0 {
                        tx.commit()?;
                        return Ok(None);
                    }
                    let task = tx.query_row(
                        &format!("SELECT {COLUMNS} FROM analysis_queue WHERE id = ?1"),
                        params![task.id],
                        task_from_row,
                    )?;
                    tx.commit()?;
                    Ok(Some(task))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a task as completed.
pub async fn complete(db: &Database, id: i64) -> Result<(), ChatlensError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE analysis_queue SET status = 'completed', last_error = NULL,
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a task as failed, keeping the error message.
pub async fn fail(db: &Database, id: i64, error: &str) -> Result<(), ChatlensError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE analysis_queue SET status = 'failed', last_error = ?1,
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Pending tasks in dequeue order.
pub async fn pending(db: &Database) -> Result<Vec<AnalysisTask>, ChatlensError> {
    db.connection()
        .call(|conn| -> Result<Vec<AnalysisTask>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM analysis_queue
                 WHERE status = 'pending'
                 ORDER BY priority DESC, id ASC"
            ))?;
            let tasks = stmt
                .query_map([], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up one task by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<AnalysisTask>, ChatlensError> {
    db.connection()
        .call(move |conn| -> Result<Option<AnalysisTask>, rusqlite::Error> {
            match conn.query_row(
                &format!("SELECT {COLUMNS} FROM analysis_queue WHERE id = ?1"),
                params![id],
                task_from_row,
            ) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Number of pending tasks.
pub async fn len(db: &Database) -> Result<usize, ChatlensError> {
    let count = db
        .connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM analysis_queue WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(usize::try_from(count).unwrap_or(0))
}
