// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion provider for deterministic pipeline tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatlens_core::{
    ChatlensError, CompletionProvider, CompletionRequest, CompletionResponse, ModelInfo,
};

/// Reply used when the script is exhausted.
pub const EMPTY_REPLY: &str = r#"{"discussions": []}"#;

/// A completion provider that replays scripted replies in order.
///
/// Every prompt it receives is recorded so tests can assert on what the
/// pipeline sent and how many calls it made.
#[derive(Clone, Default)]
pub struct MockCompletion {
    replies: Arc<Mutex<VecDeque<Result<String, ChatlensError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock pre-loaded with successful replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = replies.into_iter().map(|r| Ok(r.into())).collect();
        Self {
            replies: Arc::new(Mutex::new(queue)),
            prompts: Arc::default(),
        }
    }

    pub async fn push_reply(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a failure for the next call.
    pub async fn push_error(&self, error: ChatlensError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChatlensError> {
        let tokens_used = request.prompt.len() as u64 / 4;
        self.prompts.lock().await.push(request.prompt);
        let text = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(EMPTY_REPLY.to_string()))?;
        Ok(CompletionResponse {
            text,
            tokens_used,
            model: "mock-model".to_string(),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatlensError> {
        Ok(vec![ModelInfo {
            id: "mock-model".to_string(),
            owned_by: "tests".to_string(),
        }])
    }
}
