// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use chatlens_core::ChatlensError;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS analysis_queue (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    source      TEXT    NOT NULL,
    day         TEXT    NOT NULL,
    priority    INTEGER NOT NULL DEFAULT 0,
    batch_size  INTEGER,
    status      TEXT    NOT NULL DEFAULT 'pending',
    attempts    INTEGER NOT NULL DEFAULT 0,
    enqueued_at TEXT    NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    started_at  TEXT,
    finished_at TEXT,
    last_error  TEXT
);
CREATE INDEX IF NOT EXISTS idx_analysis_queue_pending
    ON analysis_queue (status, priority DESC, id);
";

/// Convert a tokio-rusqlite error into ChatlensError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ChatlensError {
    ChatlensError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the queue database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    pub async fn open(path: &str) -> Result<Self, ChatlensError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ChatlensError::storage)?;
            }
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ChatlensError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.initialize().await?;
        debug!(path, "queue database opened");
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), ChatlensError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                // journal_mode returns a row, so it cannot go through execute_batch.
                let _mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
                conn.execute_batch(
                    "PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;",
                )?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), ChatlensError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| ChatlensError::Storage {
            source: Box::new(e),
        })?;
        debug!("queue database closed");
        Ok(())
    }
}
