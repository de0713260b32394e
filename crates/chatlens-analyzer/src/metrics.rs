// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-discussion priority and aggregate statistics.

use std::collections::{BTreeMap, HashMap, HashSet};

use chatlens_core::discussion::{MAX_COMPLEXITY, MIN_COMPLEXITY};
use chatlens_core::{Discussion, DiscussionStats, KeywordCount, Priority, Sentiment};

/// Number of keywords reported in [`DiscussionStats::top_keywords`].
pub const TOP_KEYWORDS: usize = 10;

/// Classifies a discussion by engagement and practical value.
pub fn classify(participant_count: usize, message_count: usize, practical_value: u8) -> Priority {
    if participant_count >= 5 || message_count >= 10 || practical_value >= 8 {
        Priority::High
    } else if participant_count >= 3 || message_count >= 5 || practical_value >= 5 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Recomputes counts and priority of every discussion in place.
pub fn enrich(discussions: &mut [Discussion]) {
    for d in discussions.iter_mut() {
        d.participant_count = d.participants.len();
        d.message_count = d.message_links.len();
        d.priority = classify(d.participant_count, d.message_count, d.practical_value);
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean<I: Iterator<Item = f64>>(values: I, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    round1(values.sum::<f64>() / n as f64)
}

/// Aggregates statistics over enriched discussions.
///
/// Every priority, complexity level and sentiment appears in the breakdowns,
/// with zero when unused. Keywords are counted once per discussion,
/// case-insensitively; ties keep first appearance order.
pub fn compute_stats(discussions: &[Discussion]) -> DiscussionStats {
    let n = discussions.len();

    let mut by_priority: BTreeMap<String, usize> = [Priority::High, Priority::Medium, Priority::Low]
        .iter()
        .map(|p| (p.to_string(), 0))
        .collect();
    let mut by_complexity: BTreeMap<String, usize> = (MIN_COMPLEXITY..=MAX_COMPLEXITY)
        .map(|c| (c.to_string(), 0))
        .collect();
    let mut by_sentiment: BTreeMap<String, usize> = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Mixed,
    ]
    .iter()
    .map(|s| (s.to_string(), 0))
    .collect();

    let mut keyword_order: Vec<String> = Vec::new();
    let mut keyword_counts: HashMap<String, usize> = HashMap::new();

    for d in discussions {
        *by_priority.entry(d.priority.to_string()).or_default() += 1;
        *by_complexity.entry(d.complexity.to_string()).or_default() += 1;
        *by_sentiment.entry(d.sentiment.to_string()).or_default() += 1;

        let mut seen = HashSet::new();
        for keyword in &d.keywords {
            let folded = keyword.trim().to_lowercase();
            if folded.is_empty() || !seen.insert(folded.clone()) {
                continue;
            }
            let count = keyword_counts.entry(folded.clone()).or_insert(0);
            if *count == 0 {
                keyword_order.push(folded);
            }
            *count += 1;
        }
    }

    let mut top_keywords: Vec<KeywordCount> = keyword_order
        .into_iter()
        .map(|keyword| {
            let count = keyword_counts.get(&keyword).copied().unwrap_or(0);
            KeywordCount { keyword, count }
        })
        .collect();
    // Stable sort keeps first-appearance order among equal counts.
    top_keywords.sort_by(|a, b| b.count.cmp(&a.count));
    top_keywords.truncate(TOP_KEYWORDS);

    DiscussionStats {
        total_discussions: n,
        by_priority,
        by_complexity,
        by_sentiment,
        avg_participants: mean(discussions.iter().map(|d| d.participant_count as f64), n),
        avg_messages: mean(discussions.iter().map(|d| d.message_count as f64), n),
        avg_complexity: mean(discussions.iter().map(|d| f64::from(d.complexity)), n),
        avg_practical_value: mean(discussions.iter().map(|d| f64::from(d.practical_value)), n),
        top_keywords,
    }
}
