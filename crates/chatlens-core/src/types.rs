// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transcript, completion, queue and event layers.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Strips a leading `@` from a source handle.
///
/// `@devops_ru` and `devops_ru` name the same source everywhere.
pub fn normalize_source(source: &str) -> &str {
    let trimmed = source.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

// --- Transcript types ---

/// Kind of Telegram source a transcript was fetched from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SourceKind {
    Channel,
    Chat,
    #[serde(alias = "megagroup")]
    Supergroup,
    #[serde(alias = "user")]
    Group,
}

/// Metadata describing where a transcript came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Handle or numeric id of the source, e.g. `@devops_ru`.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    /// Public address such as `https://t.me/devops_ru`.
    pub url: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

impl SourceInfo {
    /// Last path segment of the source URL, without a leading `@`.
    pub fn username(&self) -> Option<&str> {
        let without_scheme = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let mut segments = without_scheme.split('/').filter(|s| !s.is_empty());
        segments.next()?; // host
        let segment = normalize_source(segments.last()?);
        if segment.is_empty() {
            None
        } else {
            Some(segment)
        }
    }

    /// Username used in message links: the URL segment, else the id.
    pub fn link_username(&self) -> String {
        self.username()
            .unwrap_or_else(|| normalize_source(&self.id))
            .to_string()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for source id, got {other}"
        ))),
    }
}

/// A single emoji reaction counter attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

/// One message from a daily transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(alias = "timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    pub sender_id: i64,
    #[serde(default)]
    pub reply_to_msg_id: Option<i64>,
    #[serde(default)]
    pub forward_from: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Message text, or the empty string when the message carries only media.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A validated daily dump of messages from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default = "default_version")]
    pub version: String,
    pub source_info: SourceInfo,
    /// Sender id (as decimal string) to display name.
    #[serde(default)]
    pub senders: BTreeMap<String, String>,
    pub messages: Vec<Message>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Transcript {
    /// Display name of a sender, or `Unknown`.
    pub fn sender_name(&self, sender_id: i64) -> &str {
        self.senders
            .get(&sender_id.to_string())
            .map_or("Unknown", String::as_str)
    }

    /// Ids of every message in the transcript.
    pub fn message_ids(&self) -> HashSet<i64> {
        self.messages.iter().map(|m| m.id).collect()
    }

    /// Number of distinct senders that posted at least one message.
    pub fn unique_senders(&self) -> usize {
        self.messages
            .iter()
            .map(|m| m.sender_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Checks the shape constraints that deserialization alone does not enforce.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.messages.len());
        for message in &self.messages {
            if !seen.insert(message.id) {
                return Err(format!("duplicate message id {}", message.id));
            }
        }
        if self.source_info.url.trim().is_empty() {
            return Err("source_info.url is empty".to_string());
        }
        Ok(())
    }
}

// --- Completion types ---

/// A single-turn request to the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// The assistant reply of one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub tokens_used: u64,
    pub model: String,
}

/// A model advertised by the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: String,
}

// --- Queue types ---

/// Lifecycle of a queued analysis task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A queued request to analyze one source-day.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTask {
    pub id: i64,
    pub source: String,
    pub day: String,
    pub priority: i64,
    /// Batch size to analyze with; `None` uses the configured default.
    pub batch_size: Option<usize>,
    pub status: TaskStatus,
    pub attempts: u32,
    pub enqueued_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub last_error: Option<String>,
}

// --- Event types ---

/// Notification that a fetcher has produced a fresh transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchEvent {
    pub source: String,
    pub day: String,
    pub message_count: Option<u64>,
    pub file_path: Option<String>,
    pub duration_seconds: Option<f64>,
    pub timestamp: Option<String>,
    pub correlation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn transcript() -> Transcript {
        serde_json::from_value(serde_json::json!({
            "version": "1.0",
            "source_info": {
                "id": "@devops_ru",
                "title": "DevOps RU",
                "url": "https://t.me/devops_ru",
                "type": "supergroup"
            },
            "senders": { "1": "Alice" },
            "messages": [
                { "id": 10, "date": "2025-03-01T09:00:00Z", "text": "hi", "sender_id": 1 },
                { "id": 11, "date": "2025-03-01T09:01:00Z", "text": null, "sender_id": 2,
                  "reactions": [{ "emoji": "👍", "count": 3 }] }
            ]
        }))
        .expect("fixture should deserialize")
    }

    #[test]
    fn normalize_source_strips_at_sign() {
        assert_eq!(normalize_source("@devops_ru"), "devops_ru");
        assert_eq!(normalize_source("devops_ru"), "devops_ru");
        assert_eq!(normalize_source("  @rust  "), "rust");
    }

    #[test]
    fn source_username_from_url() {
        let t = transcript();
        assert_eq!(t.source_info.username(), Some("devops_ru"));

        let mut info = t.source_info.clone();
        info.url = "https://t.me/".into();
        assert_eq!(info.username(), None);
        assert_eq!(info.link_username(), "devops_ru");

        let numeric: SourceInfo = serde_json::from_value(serde_json::json!({
            "id": -100123, "title": "t", "url": "https://t.me/x", "type": "channel"
        }))
        .unwrap();
        assert_eq!(numeric.id, "-100123");
    }

    #[test]
    fn sender_name_falls_back_to_unknown() {
        let t = transcript();
        assert_eq!(t.sender_name(1), "Alice");
        assert_eq!(t.sender_name(2), "Unknown");
        assert_eq!(t.unique_senders(), 2);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut t = transcript();
        assert!(t.validate().is_ok());
        t.messages[1].id = 10;
        assert!(t.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn media_only_message_has_empty_text() {
        let t = transcript();
        assert_eq!(t.messages[1].text_or_empty(), "");
        assert_eq!(t.messages[1].reactions[0].count, 3);
    }

    #[test]
    fn task_status_round_trips_through_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed = TaskStatus::from_str(&status.to_string()).expect("should parse");
            assert_eq!(parsed, status);
        }
        assert_eq!(TaskStatus::Processing.to_string(), "processing");
    }
}
