// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discussion records produced by the model and the persisted analysis result.
//!
//! Model output is untrusted, so deserialization here is deliberately lenient:
//! list fields accept a comma-joined string, scores accept numbers or numeric
//! strings and are clamped, and unknown enum labels fall back to a default.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Merge key of a topic: trimmed and lowercased.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Discussion priority derived from engagement and practical value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString,
    Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl From<Option<String>> for Priority {
    fn from(value: Option<String>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }
}

/// Overall tone of a discussion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
    Mixed,
}

impl From<Option<String>> for Sentiment {
    fn from(value: Option<String>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }
}

/// Expert commentary broken into sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredComment {
    #[serde(default)]
    pub problem_analysis: String,
    #[serde(default, deserialize_with = "string_list")]
    pub common_mistakes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub best_practices: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub actionable_insights: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub learning_resources: Vec<String>,
}

/// Expert commentary attached to a discussion.
///
/// Older results store a single free-text paragraph; newer prompts ask the
/// model for the structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpertComment {
    Structured(StructuredComment),
    LegacyText(String),
}

impl Default for ExpertComment {
    fn default() -> Self {
        ExpertComment::LegacyText(String::new())
    }
}

impl ExpertComment {
    pub fn is_empty(&self) -> bool {
        match self {
            ExpertComment::Structured(c) => {
                c.problem_analysis.trim().is_empty()
                    && c.common_mistakes.is_empty()
                    && c.best_practices.is_empty()
                    && c.actionable_insights.is_empty()
                    && c.learning_resources.is_empty()
            }
            ExpertComment::LegacyText(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for ExpertComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpertComment::LegacyText(text) => f.write_str(text),
            ExpertComment::Structured(c) => {
                if !c.problem_analysis.is_empty() {
                    writeln!(f, "Problem analysis: {}", c.problem_analysis)?;
                }
                let sections = [
                    ("Common mistakes", &c.common_mistakes),
                    ("Best practices", &c.best_practices),
                    ("Actionable insights", &c.actionable_insights),
                    ("Learning resources", &c.learning_resources),
                ];
                for (title, items) in sections {
                    if items.is_empty() {
                        continue;
                    }
                    writeln!(f, "{title}:")?;
                    for item in items {
                        writeln!(f, "  - {item}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A topic-centric synthesis of one or more messages.
///
/// `keywords`, `participants` and `message_links` are ordered sets: entries
/// are unique and keep first-insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    #[serde(default)]
    pub topic: String,
    #[serde(default, deserialize_with = "string_set")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "string_set")]
    pub participants: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "expert_comment")]
    pub expert_comment: ExpertComment,
    #[serde(default, deserialize_with = "string_set")]
    pub message_links: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub participant_count: usize,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default = "min_complexity", deserialize_with = "complexity")]
    pub complexity: u8,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default, deserialize_with = "practical_value")]
    pub practical_value: u8,
}

impl Discussion {
    /// A discussion with the given topic and every other field at its default.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            keywords: Vec::new(),
            participants: Vec::new(),
            summary: String::new(),
            expert_comment: ExpertComment::default(),
            message_links: Vec::new(),
            priority: Priority::default(),
            participant_count: 0,
            message_count: 0,
            complexity: MIN_COMPLEXITY,
            sentiment: Sentiment::default(),
            practical_value: 0,
        }
    }

    /// The merge key of this discussion.
    pub fn key(&self) -> String {
        normalize_topic(&self.topic)
    }

    /// Replaces participants, splitting a comma-joined entry into names.
    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.participants = split_unique(participants);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = split_unique(keywords);
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.message_links = split_unique(links);
        self
    }
}

pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 5;
pub const MAX_PRACTICAL_VALUE: u8 = 10;

fn min_complexity() -> u8 {
    MIN_COMPLEXITY
}

/// Splits every entry on commas, trims, drops blanks and duplicates.
fn split_unique<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        for part in item.as_ref().split(',') {
            let part = part.trim();
            if !part.is_empty() && seen.insert(part.to_string()) {
                out.push(part.to_string());
            }
        }
    }
    out
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<serde_json::Value>),
    Null(()),
}

impl OneOrMany {
    fn into_strings(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(values) => values
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            OneOrMany::Null(()) => Vec::new(),
        }
    }
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = OneOrMany::deserialize(deserializer)?.into_strings();
    Ok(raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn string_set<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(split_unique(OneOrMany::deserialize(deserializer)?.into_strings()))
}

fn expert_comment<'de, D>(deserializer: D) -> Result<ExpertComment, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ExpertComment>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts an integer, a float or a numeric string. `NaN` and infinities
/// count as missing.
fn score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn complexity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(score(deserializer)?
        .map(|v| v.round().clamp(f64::from(MIN_COMPLEXITY), f64::from(MAX_COMPLEXITY)) as u8)
        .unwrap_or(MIN_COMPLEXITY))
}

fn practical_value<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(score(deserializer)?
        .map(|v| v.round().clamp(0.0, f64::from(MAX_PRACTICAL_VALUE)) as u8)
        .unwrap_or(0))
}

/// Post-merge list of unique discussions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub discussions: Vec<Discussion>,
}

/// A keyword and how many discussions mention it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// Aggregate statistics over the discussions of one result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscussionStats {
    pub total_discussions: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_complexity: BTreeMap<String, usize>,
    pub by_sentiment: BTreeMap<String, usize>,
    pub avg_participants: f64,
    pub avg_messages: f64,
    pub avg_complexity: f64,
    pub avg_practical_value: f64,
    pub top_keywords: Vec<KeywordCount>,
}

/// Provenance of a stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    #[serde(alias = "chat")]
    pub source: String,
    #[serde(alias = "chat_username")]
    pub source_username: String,
    #[serde(alias = "date")]
    pub day: String,
    #[serde(alias = "analyzed_at")]
    pub produced_at: DateTime<Utc>,
    pub total_messages: usize,
    pub analyzed_messages: usize,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub latency_seconds: f64,
    /// Zero-based indices of batches that produced no discussions due to errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_batches: Vec<usize>,
    #[serde(default)]
    pub discussion_stats: Option<DiscussionStats>,
}
