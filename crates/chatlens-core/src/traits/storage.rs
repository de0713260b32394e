// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Load/save contracts for transcripts and analysis results.
//!
//! Source identifiers are normalized (leading `@` stripped) by every
//! implementation before any lookup.

use async_trait::async_trait;

use crate::discussion::{AnalysisMetadata, AnalysisResult};
use crate::error::ChatlensError;
use crate::types::Transcript;

/// Read access to daily transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Loads the transcript of `source` for `day` (`YYYY-MM-DD`).
    ///
    /// Returns [`ChatlensError::DataNotFound`] when no transcript exists.
    async fn load(&self, source: &str, day: &str) -> Result<Transcript, ChatlensError>;

    /// Days with a transcript for `source`, newest first.
    async fn list_days(&self, source: &str) -> Result<Vec<String>, ChatlensError>;
}

/// Persistence of analysis results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores a result and returns where it was written.
    async fn save(
        &self,
        source: &str,
        day: &str,
        result: &AnalysisResult,
        metadata: &AnalysisMetadata,
    ) -> Result<String, ChatlensError>;

    /// Loads a stored result, or `None` when nothing is stored.
    async fn load(
        &self,
        source: &str,
        day: &str,
    ) -> Result<Option<(AnalysisResult, AnalysisMetadata)>, ChatlensError>;

    async fn exists(&self, source: &str, day: &str) -> Result<bool, ChatlensError>;
}
