// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the GigaChat REST API.
//!
//! Provides [`GigaChatClient`], which resolves a bearer token for every call
//! and funnels each request through one retry wrapper that classifies
//! failures into the core error taxonomy.

use std::time::{Duration, Instant};

use chatlens_config::GigaChatConfig;
use chatlens_core::ChatlensError;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::token::TokenManager;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ModelsResponse, error_message};

/// How failed attempts are spaced out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub retry_delay: Duration,
    /// Wait applied to a 429 without a usable `Retry-After` header.
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Number of attempts actually made; never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay after a failed zero-based `attempt`: `retry_delay * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_delay.saturating_mul(factor)
    }

    /// Wait requested by a 429 answer.
    pub fn retry_after(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
    }
}

/// Client for the GigaChat completion and model-listing endpoints.
pub struct GigaChatClient {
    http: reqwest::Client,
    tokens: TokenManager,
    base_url: String,
    model: String,
    policy: RetryPolicy,
}

impl GigaChatClient {
    /// Builds a client from configuration and an already resolved auth secret.
    pub fn new(config: &GigaChatConfig, auth_key: SecretString) -> Result<Self, ChatlensError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ChatlensError::Config(format!("failed to build HTTP client: {e}")))?;

        let tokens = TokenManager::new(
            http.clone(),
            config.oauth_url.clone(),
            config.scope.clone(),
            auth_key,
        );

        let policy = RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs_f64(config.retry_delay_secs.max(0.0)),
            ..RetryPolicy::default()
        };

        Ok(Self {
            http,
            tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            policy,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Sends a chat completion request.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<ChatResponse, ChatlensError> {
        let request = ChatRequest::new(self.model.clone(), messages, temperature, max_tokens);
        info!(
            model = %request.model,
            messages = request.messages.len(),
            temperature,
            "sending completion request"
        );

        let started = Instant::now();
        let response = self
            .send_with_retry("chat/completions", |http, url| http.post(url).json(&request))
            .await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| ChatlensError::Api {
            status: None,
            message: format!("invalid completion response: {e}"),
        })?;

        info!(
            tokens = parsed.usage.total_tokens,
            latency_ms = started.elapsed().as_millis() as u64,
            "completion received"
        );
        Ok(parsed)
    }

    /// Lists the models available to this account.
    pub async fn list_models(&self) -> Result<ModelsResponse, ChatlensError> {
        info!("fetching available models");
        let response = self
            .send_with_retry("models", |http, url| http.get(url))
            .await?;
        let parsed: ModelsResponse = response.json().await.map_err(|e| ChatlensError::Api {
            status: None,
            message: format!("invalid models response: {e}"),
        })?;
        info!(count = parsed.data.len(), "models listed");
        Ok(parsed)
    }

    /// Performs one logical request with the retry policy applied.
    ///
    /// 429 waits for `Retry-After`; 5xx and timeouts back off exponentially;
    /// every other non-2xx fails at once.
    async fn send_with_retry<F>(
        &self,
        endpoint: &str,
        build: F,
    ) -> Result<reqwest::Response, ChatlensError>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let token = self.tokens.get_token().await?;
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let attempts = self.policy.attempts();

        for attempt in 0..attempts {
            let last = attempt + 1 == attempts;
            debug!(attempt = attempt + 1, attempts, url = %url, "sending request");

            let sent = build(&self.http, &url)
                .header(ACCEPT, "application/json")
                .bearer_auth(token.value())
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    warn!(attempt = attempt + 1, error = %e, "request timed out");
                    if last {
                        return Err(ChatlensError::Timeout { attempts });
                    }
                    tokio::time::sleep(self.policy.backoff(attempt)).await;
                    continue;
                }
                Err(e) => {
                    return Err(ChatlensError::Api {
                        status: None,
                        message: format!("request failed: {e}"),
                    });
                }
            };

            let status = response.status();
            debug!(status = status.as_u16(), attempt = attempt + 1, "response received");

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = self.policy.retry_after(response.headers());
                warn!(retry_after_secs = wait.as_secs(), "rate limit exceeded");
                if last {
                    return Err(ChatlensError::RateLimit {
                        retry_after: wait.as_secs(),
                    });
                }
                tokio::time::sleep(wait).await;
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "server error");
                if last {
                    return Err(ChatlensError::Api {
                        status: Some(status.as_u16()),
                        message: error_message(status.as_u16(), &body),
                    });
                }
                tokio::time::sleep(self.policy.backoff(attempt)).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                // The token was revoked early; make the next call exchange again.
                self.tokens.invalidate().await;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ChatlensError::Api {
                status: Some(status.as_u16()),
                message: error_message(status.as_u16(), &body),
            });
        }

        Err(ChatlensError::Api {
            status: None,
            message: "max retries exceeded".to_string(),
        })
    }
}
