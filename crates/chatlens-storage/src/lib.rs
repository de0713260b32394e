// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for Chatlens.
//!
//! Transcripts and analysis results live in plain JSON files laid out as
//! `<root>/<source>/<day>.json`; the work queue is a WAL-mode SQLite
//! database accessed through `tokio-rusqlite`'s single writer thread.

pub mod database;
pub mod queries;
pub mod queue;
pub mod results;
pub mod transcripts;

use chatlens_config::StorageConfig;

pub use database::Database;
pub use queue::AnalysisQueue;
pub use results::FileResultStore;
pub use transcripts::FileTranscriptSource;

/// File-backed transcript source and result store for a storage section.
pub fn file_stores(config: &StorageConfig) -> (FileTranscriptSource, FileResultStore) {
    (
        FileTranscriptSource::new(&config.data_path),
        FileResultStore::new(&config.output_path),
    )
}
