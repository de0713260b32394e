// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatlens show` command implementation.

use std::fmt::Write;

use chatlens_config::ChatlensConfig;
use chatlens_core::{AnalysisMetadata, AnalysisResult, ChatlensError, ResultStore};
use chatlens_storage::file_stores;

/// Run the `chatlens show` command.
pub async fn run_show(config: &ChatlensConfig, source: &str, day: &str) -> Result<(), ChatlensError> {
    let (_, results) = file_stores(&config.storage);
    match results.load(source, day).await? {
        Some((result, metadata)) => print!("{}", render_result(&result, &metadata)),
        None => println!("no analysis stored for {source} on {day}"),
    }
    Ok(())
}

/// Plain-text digest of a stored analysis.
pub fn render_result(result: &AnalysisResult, metadata: &AnalysisMetadata) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_result(&mut out, result, metadata);
    out
}

fn write_result(
    out: &mut String,
    result: &AnalysisResult,
    metadata: &AnalysisMetadata,
) -> std::fmt::Result {
    writeln!(out, "@{} on {}", metadata.source_username, metadata.day)?;
    writeln!(
        out,
        "{} discussions from {}/{} messages, model {}, {} tokens, analyzed {}",
        result.discussions.len(),
        metadata.analyzed_messages,
        metadata.total_messages,
        metadata.model,
        metadata.tokens_used,
        metadata.produced_at.format("%Y-%m-%d %H:%M UTC")
    )?;

    for (n, d) in result.discussions.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "{}. [{}] {}", n + 1, d.priority, d.topic)?;
        writeln!(
            out,
            "   {} messages, {} participants, complexity {}/5, {}, value {}/10",
            d.message_count, d.participant_count, d.complexity, d.sentiment, d.practical_value
        )?;
        if !d.keywords.is_empty() {
            writeln!(out, "   keywords: {}", d.keywords.join(", "))?;
        }
        if !d.summary.is_empty() {
            writeln!(out, "   {}", d.summary)?;
        }
        if !d.expert_comment.is_empty() {
            for line in d.expert_comment.to_string().lines() {
                writeln!(out, "   > {line}")?;
            }
        }
        for link in &d.message_links {
            writeln!(out, "   {link}")?;
        }
    }

    if let Some(stats) = &metadata.discussion_stats {
        writeln!(out)?;
        let by_priority: Vec<String> = stats
            .by_priority
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        writeln!(out, "priority: {}", by_priority.join(" "))?;
        if !stats.top_keywords.is_empty() {
            let top: Vec<String> = stats
                .top_keywords
                .iter()
                .map(|k| format!("{} ({})", k.keyword, k.count))
                .collect();
            writeln!(out, "top keywords: {}", top.join(", "))?;
        }
    }
    Ok(())
}
