// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript and model-reply builders.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use chatlens_core::{Message, SourceInfo, SourceKind, Transcript};

/// First message id of fixture transcripts.
pub const FIRST_MESSAGE_ID: i64 = 2_641_000;

/// Number of distinct senders in fixture transcripts.
pub const SENDERS: i64 = 7;

/// A transcript of `count` messages from `username`, one per minute.
///
/// Message ids are consecutive from [`FIRST_MESSAGE_ID`]; every third
/// message replies to its predecessor.
pub fn transcript(username: &str, count: usize) -> Transcript {
    let start = DateTime::<Utc>::from_timestamp(1_740_819_600, 0).unwrap_or_default();
    let messages = (0..count)
        .map(|i| {
            let id = FIRST_MESSAGE_ID + i as i64;
            Message {
                id,
                date: start + TimeDelta::minutes(i as i64),
                text: Some(format!("message number {i} about topic {}", i % 5)),
                sender_id: 1 + (i as i64 % SENDERS),
                reply_to_msg_id: (i % 3 == 2).then_some(id - 1),
                forward_from: None,
                reactions: Vec::new(),
            }
        })
        .collect();

    let senders: BTreeMap<String, String> = (1..=SENDERS)
        .map(|s| (s.to_string(), format!("Member {s}")))
        .collect();

    Transcript {
        version: "1.0".to_string(),
        source_info: SourceInfo {
            id: format!("@{username}"),
            title: format!("{username} chat"),
            url: format!("https://t.me/{username}"),
            kind: SourceKind::Supergroup,
        },
        senders,
        messages,
    }
}

/// A fenced model reply with one discussion per `(topic, message ids)` pair.
pub fn discussion_reply(username: &str, discussions: &[(&str, &[i64])]) -> String {
    let items: Vec<serde_json::Value> = discussions
        .iter()
        .map(|(topic, ids)| {
            serde_json::json!({
                "topic": topic,
                "keywords": [topic.to_lowercase()],
                "participants": ["Member 1", "Member 2"],
                "summary": format!("Summary of {topic}"),
                "expert_comment": {
                    "problem_analysis": format!("Analysis of {topic}"),
                    "common_mistakes": [],
                    "best_practices": ["write tests"],
                    "actionable_insights": [],
                    "learning_resources": []
                },
                "message_links": ids
                    .iter()
                    .map(|id| format!("https://t.me/{username}/{id}"))
                    .collect::<Vec<_>>(),
                "complexity": 3,
                "sentiment": "neutral",
                "practical_value": 6
            })
        })
        .collect();
    let body = serde_json::json!({ "discussions": items });
    let pretty = serde_json::to_string_pretty(&body).unwrap_or_default();
    format!("Here is the analysis:\n```json\n{pretty}\n```\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_has_consecutive_ids_and_known_senders() {
        let t = transcript("ru_python", 10);
        assert_eq!(t.messages.len(), 10);
        assert_eq!(t.messages[9].id, FIRST_MESSAGE_ID + 9);
        assert_eq!(t.messages[2].reply_to_msg_id, Some(FIRST_MESSAGE_ID + 1));
        assert!(t.validate().is_ok());
        assert_eq!(t.sender_name(3), "Member 3");
    }

    #[test]
    fn reply_contains_fenced_json_links() {
        let reply = discussion_reply("ru_python", &[("Async", &[FIRST_MESSAGE_ID][..])]);
        assert!(reply.contains("```json"));
        assert!(reply.contains(&format!("https://t.me/ru_python/{FIRST_MESSAGE_ID}")));
    }
}
