// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire format of fetcher notifications.
//!
//! ```json
//! {
//!   "event": "messages_fetched",
//!   "source": "ru_python",
//!   "day": "2025-11-08",
//!   "message_count": 580,
//!   "file_path": "/data/ru_python/2025-11-08.json",
//!   "duration_seconds": 15.3,
//!   "timestamp": "2025-11-08T10:30:00Z",
//!   "correlation_id": "6f1c..."
//! }
//! ```
//!
//! Older fetchers send `chat` and `date` instead of `source` and `day`;
//! both spellings are accepted.

use chatlens_core::{ChatlensError, FetchEvent};
use serde::{Deserialize, Serialize};

pub const MESSAGES_FETCHED: &str = "messages_fetched";
pub const FETCH_FAILED: &str = "fetch_failed";

/// A decoded bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// A new transcript is available.
    MessagesFetched(FetchEvent),
    /// The fetcher gave up on a source-day.
    FetchFailed {
        source: Option<String>,
        day: Option<String>,
        error: Option<String>,
        correlation_id: String,
    },
    /// Any other event type; ignored by the analyzer.
    Other { event: String },
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day: Option<String>,
    /// Older fetchers send `chat` and `date`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn malformed(message: impl Into<String>) -> ChatlensError {
    ChatlensError::Bus {
        message: message.into(),
        source: None,
    }
}

/// Decodes one payload.
///
/// A missing correlation id is replaced by a fresh one. Fails with
/// [`ChatlensError::Bus`] when the payload is not a JSON object, has no
/// `event` field, or is a `messages_fetched` event without source or day.
pub fn decode(payload: &str) -> Result<BusEvent, ChatlensError> {
    let raw: RawEvent = serde_json::from_str(payload).map_err(|e| ChatlensError::Bus {
        message: "invalid event JSON".to_string(),
        source: Some(Box::new(e)),
    })?;

    let event = non_empty(raw.event).ok_or_else(|| malformed("event has no 'event' field"))?;
    let correlation_id = non_empty(raw.correlation_id)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let source = non_empty(raw.source).or_else(|| non_empty(raw.chat));
    let day = non_empty(raw.day).or_else(|| non_empty(raw.date));

    match event.as_str() {
        MESSAGES_FETCHED => {
            let source = source.ok_or_else(|| malformed("messages_fetched event has no source"))?;
            let day = day.ok_or_else(|| malformed("messages_fetched event has no day"))?;
            Ok(BusEvent::MessagesFetched(FetchEvent {
                source,
                day,
                message_count: raw.message_count,
                file_path: raw.file_path,
                duration_seconds: raw.duration_seconds,
                timestamp: raw.timestamp,
                correlation_id,
            }))
        }
        FETCH_FAILED => Ok(BusEvent::FetchFailed {
            source,
            day,
            error: raw.error,
            correlation_id,
        }),
        _ => Ok(BusEvent::Other { event }),
    }
}

/// Canonical `messages_fetched` payload for `event`.
///
/// Fills in the current time when the event carries no timestamp.
pub fn fetch_event_payload(event: &FetchEvent) -> Result<String, ChatlensError> {
    let raw = RawEvent {
        event: Some(MESSAGES_FETCHED.to_string()),
        source: Some(event.source.clone()),
        day: Some(event.day.clone()),
        chat: None,
        date: None,
        message_count: event.message_count,
        file_path: event.file_path.clone(),
        duration_seconds: event.duration_seconds,
        timestamp: Some(
            event
                .timestamp
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        ),
        correlation_id: Some(event.correlation_id.clone()),
        error: None,
    };
    serde_json::to_string(&raw).map_err(|e| ChatlensError::Bus {
        message: "cannot encode event".to_string(),
        source: Some(Box::new(e)),
    })
}
