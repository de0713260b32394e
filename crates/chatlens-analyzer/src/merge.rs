// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciling discussions found independently by different batches.
//!
//! Records are folded in arrival order into an accumulator keyed by the
//! normalized topic; the accumulator is then materialized in order of first
//! appearance. Rules per field:
//!
//! - `keywords`: union, a repeated keyword moves to the end, only the five
//!   most recent survive
//! - `participants`, `message_links`: ordered union
//! - `complexity`: maximum
//! - `summary`, `expert_comment`, `practical_value`: taken from the record
//!   with the strictly higher practical value
//! - `sentiment`: majority vote, ties go to the value seen first

use std::collections::HashMap;

use chatlens_core::{Discussion, Sentiment};

/// Keywords kept per merged discussion.
pub const MAX_KEYWORDS: usize = 5;

struct Entry {
    discussion: Discussion,
    votes: Vec<(Sentiment, usize)>,
}

impl Entry {
    fn seed(mut discussion: Discussion) -> Self {
        discussion.keywords = recent_unique(std::mem::take(&mut discussion.keywords));
        discussion.participants = ordered_union(Vec::new(), discussion.participants);
        discussion.message_links = ordered_union(Vec::new(), discussion.message_links);
        let votes = vec![(discussion.sentiment, 1)];
        Self { discussion, votes }
    }

    fn absorb(&mut self, incoming: Discussion) {
        let current = &mut self.discussion;

        let mut keywords = std::mem::take(&mut current.keywords);
        keywords.extend(incoming.keywords);
        current.keywords = recent_unique(keywords);

        current.participants =
            ordered_union(std::mem::take(&mut current.participants), incoming.participants);
        current.message_links =
            ordered_union(std::mem::take(&mut current.message_links), incoming.message_links);

        current.complexity = current.complexity.max(incoming.complexity);

        if incoming.practical_value > current.practical_value {
            current.summary = incoming.summary;
            current.expert_comment = incoming.expert_comment;
            current.practical_value = incoming.practical_value;
        }

        match self.votes.iter_mut().find(|(s, _)| *s == incoming.sentiment) {
            Some((_, count)) => *count += 1,
            None => self.votes.push((incoming.sentiment, 1)),
        }
    }

    fn finish(mut self) -> Discussion {
        let mut winner: Option<(Sentiment, usize)> = None;
        for &(sentiment, count) in &self.votes {
            if winner.is_none_or(|(_, best)| count > best) {
                winner = Some((sentiment, count));
            }
        }
        if let Some((sentiment, _)) = winner {
            self.discussion.sentiment = sentiment;
        }
        self.discussion
    }
}

#[derive(Default)]
struct Accumulator {
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl Accumulator {
    fn fold(mut self, discussion: Discussion) -> Self {
        let key = discussion.key();
        if key.is_empty() {
            return self;
        }
        match self.entries.get_mut(&key) {
            Some(entry) => entry.absorb(discussion),
            None => {
                self.order.push(key.clone());
                self.entries.insert(key, Entry::seed(discussion));
            }
        }
        self
    }

    fn finish(mut self) -> Vec<Discussion> {
        self.order
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .map(Entry::finish)
            .collect()
    }
}

/// Merges discussions into a list with one entry per normalized topic.
///
/// Records with an empty topic are dropped. The output keeps the order in
/// which each topic first appeared.
pub fn merge<I>(discussions: I) -> Vec<Discussion>
where
    I: IntoIterator<Item = Discussion>,
{
    discussions
        .into_iter()
        .fold(Accumulator::default(), Accumulator::fold)
        .finish()
}

/// Unique entries, a repeated entry keeping its last position, capped to
/// the most recent [`MAX_KEYWORDS`].
fn recent_unique(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        out.retain(|existing| *existing != item);
        out.push(item);
    }
    let excess = out.len().saturating_sub(MAX_KEYWORDS);
    out.split_off(excess)
}

fn ordered_union(mut base: Vec<String>, extra: Vec<String>) -> Vec<String> {
    for item in extra {
        if !base.contains(&item) {
            base.push(item);
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_core::ExpertComment;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn d(topic: &str) -> Discussion {
        Discussion::new(topic)
    }

    #[test]
    fn same_topic_from_two_batches_merges() {
        let mut a = d("Rust Async")
            .with_participants(["Alice"])
            .with_links(["https://t.me/r/1"])
            .with_keywords(["tokio"]);
        a.complexity = 2;
        a.practical_value = 4;
        a.summary = "first".into();

        let mut b = d("  rust async ")
            .with_participants(["Bob", "Alice"])
            .with_links(["https://t.me/r/2"])
            .with_keywords(["futures"]);
        b.complexity = 4;
        b.practical_value = 7;
        b.summary = "second".into();
        b.expert_comment = ExpertComment::LegacyText("better".into());

        let merged = merge([a, b]);
        assert_eq!(merged.len(), 1);
        let m = &merged[0];
        assert_eq!(m.topic, "Rust Async");
        assert_eq!(m.participants, vec!["Alice", "Bob"]);
        assert_eq!(m.message_links, vec!["https://t.me/r/1", "https://t.me/r/2"]);
        assert_eq!(m.keywords, vec!["tokio", "futures"]);
        assert_eq!(m.complexity, 4);
        assert_eq!(m.practical_value, 7);
        assert_eq!(m.summary, "second");
        assert_eq!(m.expert_comment, ExpertComment::LegacyText("better".into()));
    }

    #[test]
    fn lower_or_equal_value_keeps_narrative() {
        let mut a = d("x");
        a.practical_value = 6;
        a.summary = "kept".into();
        let mut b = d("X");
        b.practical_value = 6;
        b.summary = "ignored".into();
        assert_eq!(merge([a, b])[0].summary, "kept");
    }

    #[test]
    fn keywords_keep_five_most_recent() {
        let a = d("t").with_keywords(["a", "b", "c", "d"]);
        let b = d("t").with_keywords(["e", "a", "f"]);
        assert_eq!(merge([a, b])[0].keywords, vec!["c", "d", "e", "a", "f"]);
    }

    #[test]
    fn empty_topics_are_dropped() {
        let merged = merge([d(""), d("   "), d("real")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].topic, "real");
    }

    #[test]
    fn first_appearance_order_is_kept() {
        let merged = merge([d("b"), d("a"), d("B"), d("c")]);
        let topics: Vec<&str> = merged.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(topics, vec!["b", "a", "c"]);
    }

    #[test]
    fn sentiment_majority_with_first_seen_tiebreak() {
        let with = |s: Sentiment| {
            let mut x = d("t");
            x.sentiment = s;
            x
        };
        let merged = merge([
            with(Sentiment::Positive),
            with(Sentiment::Negative),
            with(Sentiment::Negative),
        ]);
        assert_eq!(merged[0].sentiment, Sentiment::Negative);

        let tied = merge([with(Sentiment::Mixed), with(Sentiment::Positive)]);
        assert_eq!(tied[0].sentiment, Sentiment::Mixed);
    }

    fn arb_discussion() -> impl Strategy<Value = Discussion> {
        (
            prop::sample::select(vec!["Async", "async ", "Docker", "CI", "ci", "Types"]),
            prop::collection::vec("[a-e]", 0..4),
            prop::collection::vec(1u32..20, 0..4),
            1u8..=5,
            0u8..=10,
            prop::sample::select(vec![
                Sentiment::Positive,
                Sentiment::Negative,
                Sentiment::Neutral,
                Sentiment::Mixed,
            ]),
        )
            .prop_map(|(topic, keywords, ids, complexity, value, sentiment)| {
                let mut x = Discussion::new(topic)
                    .with_keywords(keywords)
                    .with_links(ids.iter().map(|i| format!("https://t.me/r/{i}")));
                x.complexity = complexity;
                x.practical_value = value;
                x.sentiment = sentiment;
                x.summary = format!("{topic}-{value}");
                x
            })
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(input in prop::collection::vec(arb_discussion(), 0..20)) {
            let once = merge(input);
            let twice = merge(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn key_set_and_links_are_order_independent(
            ab in prop::collection::vec(arb_discussion(), 0..12),
            c in prop::collection::vec(arb_discussion(), 0..12),
        ) {
            let forward = merge(ab.iter().cloned().chain(c.iter().cloned()));
            let backward = merge(c.into_iter().chain(ab));

            let summarize = |merged: &[Discussion]| -> BTreeSet<(String, BTreeSet<String>)> {
                merged
                    .iter()
                    .map(|m| (m.key(), m.message_links.iter().cloned().collect()))
                    .collect()
            };
            prop_assert_eq!(summarize(&forward), summarize(&backward));
        }
    }
}
