// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analysis results stored as `<root>/<source>/<day>.json`.
//!
//! Each file holds `{"metadata": ..., "discussions": [...]}` as pretty JSON.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never sees a half-written result.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chatlens_core::{
    AnalysisMetadata, AnalysisResult, ChatlensError, Discussion, ResultStore, normalize_source,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::transcripts::{json_stem, list_dir_names};

#[derive(Serialize)]
struct StoredRef<'a> {
    metadata: &'a AnalysisMetadata,
    discussions: &'a [Discussion],
}

#[derive(Deserialize)]
struct Stored {
    metadata: AnalysisMetadata,
    #[serde(default)]
    discussions: Vec<Discussion>,
}

/// File-backed [`ResultStore`].
#[derive(Debug, Clone)]
pub struct FileResultStore {
    root: PathBuf,
}

impl FileResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn result_path(&self, source: &str, day: &str) -> PathBuf {
        self.root
            .join(normalize_source(source))
            .join(format!("{day}.json"))
    }

    /// Days with a stored result for `source`, oldest first.
    pub async fn list_days(&self, source: &str) -> Result<Vec<String>, ChatlensError> {
        list_dir_names(&self.root.join(normalize_source(source)), json_stem).await
    }

    /// Sources with at least one result directory, sorted.
    pub async fn list_sources(&self) -> Result<Vec<String>, ChatlensError> {
        list_dir_names(&self.root, |path, is_dir| {
            if !is_dir {
                return None;
            }
            path.file_name()?.to_str().map(str::to_string)
        })
        .await
    }

    /// Removes a stored result. Returns whether anything was deleted.
    pub async fn delete(&self, source: &str, day: &str) -> Result<bool, ChatlensError> {
        let path = self.result_path(source, day);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "analysis result deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ChatlensError::storage(e)),
        }
    }

    /// The most recent stored result of `source`, if any.
    pub async fn latest(
        &self,
        source: &str,
    ) -> Result<Option<(AnalysisResult, AnalysisMetadata)>, ChatlensError> {
        match self.list_days(source).await?.pop() {
            Some(day) => self.load(source, &day).await,
            None => Ok(None),
        }
    }

    /// Whether the result for `source` on `day` is missing or older than
    /// the transcript at `transcript_path`.
    pub async fn needs_analysis(
        &self,
        source: &str,
        day: &str,
        transcript_path: &Path,
    ) -> Result<bool, ChatlensError> {
        let Some(result_mtime) = modified(&self.result_path(source, day)).await? else {
            return Ok(true);
        };
        let transcript_mtime = modified(transcript_path).await?;
        Ok(transcript_mtime.is_some_and(|t| t > result_mtime))
    }
}

async fn modified(path: &Path) -> Result<Option<SystemTime>, ChatlensError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.modified().map_err(ChatlensError::storage)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ChatlensError::storage(e)),
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn save(
        &self,
        source: &str,
        day: &str,
        result: &AnalysisResult,
        metadata: &AnalysisMetadata,
    ) -> Result<String, ChatlensError> {
        let path = self.result_path(source, day);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(ChatlensError::storage)?;
        }

        let body = serde_json::to_string_pretty(&StoredRef {
            metadata,
            discussions: &result.discussions,
        })
        .map_err(ChatlensError::storage)?;

        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(ChatlensError::storage)?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(ChatlensError::storage)?;

        debug!(path = %path.display(), "analysis result written");
        Ok(path.display().to_string())
    }

    async fn load(
        &self,
        source: &str,
        day: &str,
    ) -> Result<Option<(AnalysisResult, AnalysisMetadata)>, ChatlensError> {
        let path = self.result_path(source, day);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ChatlensError::storage(e)),
        };
        let stored: Stored = serde_json::from_str(&text).map_err(ChatlensError::storage)?;
        Ok(Some((
            AnalysisResult {
                discussions: stored.discussions,
            },
            stored.metadata,
        )))
    }

    async fn exists(&self, source: &str, day: &str) -> Result<bool, ChatlensError> {
        tokio::fs::try_exists(self.result_path(source, day))
            .await
            .map_err(ChatlensError::storage)
    }
}
