// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth access token lifecycle.
//!
//! [`TokenManager`] caches one bearer token per client and replaces it
//! wholesale shortly before it expires. Reads of a fresh token only take a
//! shared lock; the exchange itself is serialized behind a separate gate so
//! that concurrent callers wait for a single in-flight refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chatlens_core::ChatlensError;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::types::TokenResponse;

/// A token is refreshed once fewer than this many seconds of validity remain.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// A bearer credential and the instant it stops being accepted.
pub struct AccessToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token may still be used at `now`, keeping the refresh margin.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Obtains and caches access tokens through the OAuth endpoint.
pub struct TokenManager {
    http: reqwest::Client,
    oauth_url: String,
    scope: String,
    auth_key: SecretString,
    cached: RwLock<Option<Arc<AccessToken>>>,
    refresh_gate: Mutex<()>,
    exchanges: AtomicU64,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        oauth_url: impl Into<String>,
        scope: impl Into<String>,
        auth_key: SecretString,
    ) -> Self {
        Self {
            http,
            oauth_url: oauth_url.into(),
            scope: scope.into(),
            auth_key,
            cached: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Returns a token that is valid for at least the refresh margin.
    pub async fn get_token(&self) -> Result<Arc<AccessToken>, ChatlensError> {
        if let Some(token) = self.fresh_cached().await {
            debug!("using cached access token");
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate.
        if let Some(token) = self.fresh_cached().await {
            return Ok(token);
        }

        let token = Arc::new(self.exchange().await?);
        *self.cached.write().await = Some(Arc::clone(&token));
        Ok(token)
    }

    /// Drops the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    /// Number of credential exchanges performed so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    async fn fresh_cached(&self) -> Option<Arc<AccessToken>> {
        let guard = self.cached.read().await;
        guard
            .as_ref()
            .filter(|t| t.is_fresh_at(Utc::now()))
            .map(Arc::clone)
    }

    async fn exchange(&self) -> Result<AccessToken, ChatlensError> {
        let rq_uid = uuid::Uuid::new_v4().to_string();
        info!(rq_uid = %rq_uid, "requesting new access token");
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let response = self
            .http
            .post(&self.oauth_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .header("RqUID", &rq_uid)
            .header(
                AUTHORIZATION,
                format!("Basic {}", self.auth_key.expose_secret()),
            )
            .body(format!("scope={}", self.scope))
            .send()
            .await
            .map_err(|e| ChatlensError::Auth {
                message: format!("OAuth request failed: {e}"),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("OAuth endpoint rejected the authorization key");
            return Err(ChatlensError::Auth {
                message: "invalid authorization key".to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OAuth request failed");
            return Err(ChatlensError::Auth {
                message: format!("OAuth request failed ({status}): {}", body.trim()),
            });
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| ChatlensError::Auth {
            message: format!("invalid OAuth response: {e}"),
        })?;

        let expires_at =
            DateTime::<Utc>::from_timestamp_millis(parsed.expires_at).ok_or_else(|| {
                ChatlensError::Auth {
                    message: format!("invalid token expiry {}", parsed.expires_at),
                }
            })?;

        info!(expires_at = %expires_at, "access token obtained");
        Ok(AccessToken::new(parsed.access_token, expires_at))
    }
}
