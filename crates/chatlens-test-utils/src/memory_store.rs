// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory transcript source and result store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use chatlens_core::{
    AnalysisMetadata, AnalysisResult, ChatlensError, ResultStore, Transcript, TranscriptSource,
    normalize_source,
};

fn key(source: &str, day: &str) -> (String, String) {
    (normalize_source(source).to_string(), day.to_string())
}

/// Transcripts held in a map keyed by normalized source and day.
#[derive(Clone, Default)]
pub struct MemoryTranscripts {
    inner: Arc<RwLock<HashMap<(String, String), Transcript>>>,
}

impl MemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, source: &str, day: &str, transcript: Transcript) {
        self.inner.write().await.insert(key(source, day), transcript);
    }
}

#[async_trait]
impl TranscriptSource for MemoryTranscripts {
    async fn load(&self, source: &str, day: &str) -> Result<Transcript, ChatlensError> {
        self.inner
            .read()
            .await
            .get(&key(source, day))
            .cloned()
            .ok_or_else(|| ChatlensError::DataNotFound {
                chat: normalize_source(source).to_string(),
                day: day.to_string(),
                path: format!("memory://{}/{day}", normalize_source(source)),
            })
    }

    async fn list_days(&self, source: &str) -> Result<Vec<String>, ChatlensError> {
        let wanted = normalize_source(source);
        let mut days: Vec<String> = self
            .inner
            .read()
            .await
            .keys()
            .filter(|(s, _)| s == wanted)
            .map(|(_, d)| d.clone())
            .collect();
        days.sort_by(|a, b| b.cmp(a));
        Ok(days)
    }
}

/// Results stored as serialized JSON, so loads go through the same
/// serde path as the file store.
#[derive(Clone, Default)]
pub struct MemoryResults {
    inner: Arc<RwLock<HashMap<(String, String), String>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The raw stored document, if any.
    pub async fn raw(&self, source: &str, day: &str) -> Option<String> {
        self.inner.read().await.get(&key(source, day)).cloned()
    }
}

#[async_trait]
impl ResultStore for MemoryResults {
    async fn save(
        &self,
        source: &str,
        day: &str,
        result: &AnalysisResult,
        metadata: &AnalysisMetadata,
    ) -> Result<String, ChatlensError> {
        let document = serde_json::json!({
            "metadata": metadata,
            "discussions": result.discussions,
        });
        let text = serde_json::to_string_pretty(&document).map_err(ChatlensError::storage)?;
        self.inner.write().await.insert(key(source, day), text);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(format!("memory://{}/{day}", normalize_source(source)))
    }

    async fn load(
        &self,
        source: &str,
        day: &str,
    ) -> Result<Option<(AnalysisResult, AnalysisMetadata)>, ChatlensError> {
        let Some(text) = self.raw(source, day).await else {
            return Ok(None);
        };
        let mut value: serde_json::Value =
            serde_json::from_str(&text).map_err(ChatlensError::storage)?;
        let metadata: AnalysisMetadata = serde_json::from_value(value["metadata"].take())
            .map_err(ChatlensError::storage)?;
        let result = AnalysisResult {
            discussions: serde_json::from_value(value["discussions"].take())
                .map_err(ChatlensError::storage)?,
        };
        Ok(Some((result, metadata)))
    }

    async fn exists(&self, source: &str, day: &str) -> Result<bool, ChatlensError> {
        Ok(self.inner.read().await.contains_key(&key(source, day)))
    }
}
