// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for the remote language model.

use async_trait::async_trait;

use crate::error::ChatlensError;
use crate::types::{CompletionRequest, CompletionResponse, ModelInfo};

/// A remote chat-completion service.
///
/// Implementations own authentication and retry handling; callers see one
/// classified error per failed call.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name used in logs and stored metadata.
    fn name(&self) -> &str;

    /// Sends a single-turn completion request.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChatlensError>;

    /// Lists the models the service currently offers.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatlensError>;
}
