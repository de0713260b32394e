// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatlens analyzer.

use thiserror::Error;

/// The primary error type used across all Chatlens crates.
#[derive(Debug, Error)]
pub enum ChatlensError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential exchange was rejected. Never retried.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Retries exhausted after honoring `Retry-After`.
    #[error("rate limit exceeded (retry after {retry_after}s)")]
    RateLimit { retry_after: u64 },

    /// Retries exhausted on network timeouts.
    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// Any other non-2xx answer from the completion service.
    #[error("completion API error{}: {message}", format_status(status))]
    Api { status: Option<u16>, message: String },

    /// The model reply did not contain usable JSON.
    #[error("failed to parse model response: {message}")]
    Parse { message: String },

    /// No transcript exists for the requested source and day.
    #[error("no transcript for '{chat}' on {day}: {path}")]
    DataNotFound {
        chat: String,
        day: String,
        path: String,
    },

    /// The transcript exists but does not match the data contract.
    #[error("invalid transcript data: {0}")]
    DataValidation(String),

    /// Generated message references failed validation. Advisory only.
    #[error("{} link violation(s)", violations.len())]
    Validation { violations: Vec<String> },

    /// Storage backend errors (filesystem, SQLite, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Pub/sub transport errors.
    #[error("event bus error: {message}")]
    Bus {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The pipeline could not produce a result for the request.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ChatlensError {
    /// Stable snake_case label used as the `error_kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatlensError::Config(_) => "config",
            ChatlensError::Auth { .. } => "auth",
            ChatlensError::RateLimit { .. } => "rate_limit",
            ChatlensError::Timeout { .. } => "timeout",
            ChatlensError::Api { .. } => "api",
            ChatlensError::Parse { .. } => "parse",
            ChatlensError::DataNotFound { .. } => "data_not_found",
            ChatlensError::DataValidation(_) => "data_validation",
            ChatlensError::Validation { .. } => "validation",
            ChatlensError::Storage { .. } => "storage",
            ChatlensError::Bus { .. } => "bus",
            ChatlensError::Analysis(_) => "analysis",
            ChatlensError::Internal(_) => "internal",
        }
    }

    /// Whether a failure inside one batch should degrade to an empty batch
    /// instead of aborting the whole run.
    pub fn is_batch_recoverable(&self) -> bool {
        matches!(
            self,
            ChatlensError::Auth { .. }
                | ChatlensError::RateLimit { .. }
                | ChatlensError::Timeout { .. }
                | ChatlensError::Api { .. }
                | ChatlensError::Parse { .. }
        )
    }

    /// Shorthand for a storage error wrapping any std error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ChatlensError::Storage {
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status() {
        let err = ChatlensError::Api {
            status: Some(404),
            message: "no such model".into(),
        };
        assert_eq!(err.to_string(), "completion API error (404): no such model");

        let err = ChatlensError::Api {
            status: None,
            message: "max retries exceeded".into(),
        };
        assert_eq!(err.to_string(), "completion API error: max retries exceeded");
    }

    #[test]
    fn remote_failures_are_batch_recoverable() {
        assert!(ChatlensError::Auth { message: "x".into() }.is_batch_recoverable());
        assert!(ChatlensError::RateLimit { retry_after: 60 }.is_batch_recoverable());
        assert!(ChatlensError::Timeout { attempts: 3 }.is_batch_recoverable());
        assert!(ChatlensError::Parse { message: "x".into() }.is_batch_recoverable());
        assert!(
            !ChatlensError::DataNotFound {
                chat: "c".into(),
                day: "d".into(),
                path: "p".into()
            }
            .is_batch_recoverable()
        );
        assert!(!ChatlensError::Internal("x".into()).is_batch_recoverable());
    }

    #[test]
    fn kinds_are_distinct_labels() {
        assert_eq!(ChatlensError::Timeout { attempts: 1 }.kind(), "timeout");
        assert_eq!(ChatlensError::RateLimit { retry_after: 1 }.kind(), "rate_limit");
        assert_eq!(
            ChatlensError::Validation { violations: vec![] }.kind(),
            "validation"
        );
    }
}
