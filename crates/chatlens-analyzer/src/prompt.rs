// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering the analysis prompt for one batch of messages.
//!
//! Templates use `{name}` placeholders and `{{` / `}}` for literal braces.
//! Unknown placeholders are left untouched.

use chatlens_config::AnalysisConfig;
use chatlens_core::{ChatlensError, Message, Transcript};
use serde::Serialize;
use tracing::debug;

/// Built-in prompt used when `analysis.prompt_template` is not set.
pub const DEFAULT_TEMPLATE: &str = r#"You are an experienced engineer reviewing a day of messages from the Telegram chat "{chat_name}" (@{chat_username}) on {date}.

Below are {message_count} messages as a JSON array. Each message has an id, a timestamp, a sender, the text and the id of the message it replies to.

{messages_json}

Group the messages into discussions. A discussion is a set of messages about one topic. For every discussion produce:
- topic: a short title
- keywords: up to 5 keywords
- participants: sender names that took part
- summary: 2-4 sentences on what was discussed and what was concluded
- expert_comment: an object with problem_analysis (string), common_mistakes, best_practices, actionable_insights and learning_resources (lists of strings)
- message_links: links of the form https://t.me/{chat_username}/<id> for the messages of the discussion, using only ids from the list above
- complexity: 1 (trivial) to 5 (expert)
- sentiment: one of positive, negative, neutral, mixed
- practical_value: 1 (chatter) to 10 (immediately useful)

Skip greetings, off-topic chatter and single messages without replies.

Answer with JSON only, in a ```json fenced block, shaped as:
{{"discussions": [{{"topic": "...", "keywords": [], "participants": [], "summary": "...", "expert_comment": {{"problem_analysis": "...", "common_mistakes": [], "best_practices": [], "actionable_insights": [], "learning_resources": []}}, "message_links": [], "complexity": 1, "sentiment": "neutral", "practical_value": 1}}]}}
"#;

/// How messages are laid out inside the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    /// Pretty JSON array of `{id, timestamp, sender, text, reply_to}`.
    #[default]
    Json,
    /// One `[id] sender (reply to N): text` line per message.
    Text,
}

#[derive(Serialize)]
struct PromptMessage<'a> {
    id: i64,
    timestamp: String,
    sender: &'a str,
    text: &'a str,
    reply_to: Option<i64>,
}

/// Renders prompts from a template.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
    format: MessageFormat,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            format: MessageFormat::default(),
        }
    }

    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    /// Uses the template file named in the configuration, or the built-in one.
    pub async fn from_config(config: &AnalysisConfig) -> Result<Self, ChatlensError> {
        match config.prompt_template.as_deref() {
            Some(path) => {
                let template = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ChatlensError::Config(format!("cannot read prompt template {path}: {e}"))
                })?;
                debug!(path, "loaded prompt template");
                Ok(Self::new(template))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Renders the prompt for `messages`, a slice of `transcript`.
    pub fn build(
        &self,
        transcript: &Transcript,
        chat_username: &str,
        day: &str,
        messages: &[Message],
    ) -> Result<String, ChatlensError> {
        let formatted = self.format_messages(transcript, messages)?;
        let count = messages.len().to_string();
        Ok(render(
            &self.template,
            &[
                ("chat_name", transcript.source_info.title.as_str()),
                ("chat_username", chat_username),
                ("date", day),
                ("message_count", count.as_str()),
                ("messages_json", formatted.as_str()),
            ],
        ))
    }

    /// Formats messages in the configured [`MessageFormat`].
    pub fn format_messages(
        &self,
        transcript: &Transcript,
        messages: &[Message],
    ) -> Result<String, ChatlensError> {
        match self.format {
            MessageFormat::Json => {
                let rows: Vec<PromptMessage<'_>> = messages
                    .iter()
                    .map(|m| PromptMessage {
                        id: m.id,
                        timestamp: m.date.to_rfc3339(),
                        sender: transcript.sender_name(m.sender_id),
                        text: m.text_or_empty(),
                        reply_to: m.reply_to_msg_id,
                    })
                    .collect();
                serde_json::to_string_pretty(&rows)
                    .map_err(|e| ChatlensError::Internal(format!("cannot format messages: {e}")))
            }
            MessageFormat::Text => Ok(messages
                .iter()
                .map(|m| {
                    let reply = m
                        .reply_to_msg_id
                        .map(|id| format!(" (reply to {id})"))
                        .unwrap_or_default();
                    format!(
                        "[{}] {}{reply}: {}",
                        m.id,
                        transcript.sender_name(m.sender_id),
                        m.text_or_empty()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }
}

/// Substitutes `{name}` placeholders in one pass.
///
/// Substituted values are never rescanned, so braces inside message text
/// survive verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            let value = tail[1..].find('}').and_then(|end| {
                let name = &tail[1..=end];
                vars.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| (*v, end + 2))
            });
            match value {
                Some((v, consumed)) => {
                    out.push_str(v);
                    rest = &tail[consumed..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
