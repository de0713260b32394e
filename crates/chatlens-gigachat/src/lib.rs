// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GigaChat completion provider for Chatlens.
//!
//! This crate implements [`CompletionProvider`] on top of the GigaChat REST
//! API: OAuth token caching ([`token`]), the retrying HTTP client
//! ([`client`]) and the wire types ([`types`]).

pub mod client;
pub mod token;
pub mod types;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chatlens_config::GigaChatConfig;
use chatlens_core::{
    ChatlensError, CompletionProvider, CompletionRequest, CompletionResponse, ModelInfo,
};
use secrecy::SecretString;
use tracing::info;

pub use crate::client::{GigaChatClient, RetryPolicy};
pub use crate::token::{AccessToken, TokenManager};

/// Resolves the Basic authorization secret.
///
/// Uses `auth_key` when set; otherwise encodes `client_id:client_secret`.
pub fn resolve_auth_key(config: &GigaChatConfig) -> Result<SecretString, ChatlensError> {
    if let Some(key) = config.auth_key.as_deref().map(str::trim) {
        if !key.is_empty() {
            return Ok(SecretString::from(key.to_string()));
        }
    }

    match (config.client_id.as_deref(), config.client_secret.as_deref()) {
        (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
            let encoded = STANDARD.encode(format!("{}:{}", id.trim(), secret.trim()));
            Ok(SecretString::from(encoded))
        }
        _ => Err(ChatlensError::Config(
            "gigachat.auth_key is not set (set CHATLENS_GIGACHAT_AUTH_KEY, GIGACHAT_AUTH_KEY, \
             or gigachat.client_id and gigachat.client_secret)"
                .to_string(),
        )),
    }
}

/// GigaChat implementation of [`CompletionProvider`].
pub struct GigaChatProvider {
    client: GigaChatClient,
}

impl GigaChatProvider {
    /// Creates a provider from configuration, resolving credentials first.
    pub fn new(config: &GigaChatConfig) -> Result<Self, ChatlensError> {
        let auth_key = resolve_auth_key(config)?;
        let client = GigaChatClient::new(config, auth_key)?;
        info!(
            model = %config.model,
            base_url = %config.base_url,
            max_retries = config.max_retries,
            "GigaChat provider initialized"
        );
        Ok(Self { client })
    }

    pub fn client(&self) -> &GigaChatClient {
        &self.client
    }
}

#[async_trait]
impl CompletionProvider for GigaChatProvider {
    fn name(&self) -> &str {
        "gigachat"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChatlensError> {
        let response = self
            .client
            .complete(
                vec![types::ChatMessage::user(request.prompt)],
                request.temperature,
                request.max_tokens,
            )
            .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ChatlensError::Api {
                status: None,
                message: "completion response contained no choices".to_string(),
            })?;

        Ok(CompletionResponse {
            text,
            tokens_used: response.usage.total_tokens,
            model: response.model,
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatlensError> {
        let models = self.client.list_models().await?;
        Ok(models
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
            })
            .collect())
    }
}
