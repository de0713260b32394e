// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatlens enqueue` and `chatlens queue`.

use chatlens_config::ChatlensConfig;
use chatlens_core::{ChatlensError, TranscriptSource, normalize_source};
use chatlens_storage::{AnalysisQueue, FileResultStore, FileTranscriptSource, file_stores};
use tracing::debug;

/// Queues every day of `source` whose result is missing or older than its
/// transcript.
///
/// Days are visited newest first; the newest gets `priority` and each older
/// day one less. Returns the queued days with their task ids.
pub async fn enqueue_stale(
    transcripts: &FileTranscriptSource,
    results: &FileResultStore,
    queue: &AnalysisQueue,
    source: &str,
    priority: i64,
    batch_size: Option<usize>,
) -> Result<Vec<(String, i64)>, ChatlensError> {
    let source = normalize_source(source);
    let mut queued = Vec::new();
    let mut next_priority = priority;
    for day in transcripts.list_days(source).await? {
        let transcript_path = transcripts.transcript_path(source, &day);
        if !results.needs_analysis(source, &day, &transcript_path).await? {
            debug!(source, day = %day, "result is current");
            continue;
        }
        let id = queue.enqueue(source, &day, next_priority, batch_size).await?;
        queued.push((day, id));
        next_priority -= 1;
    }
    Ok(queued)
}

/// Run the `chatlens enqueue` command.
pub async fn run_enqueue(
    config: &ChatlensConfig,
    source: &str,
    priority: i64,
    batch_size: Option<usize>,
) -> Result<(), ChatlensError> {
    let (transcripts, results) = file_stores(&config.storage);
    let queue = AnalysisQueue::open(&config.storage.queue_path).await?;
    let queued = enqueue_stale(&transcripts, &results, &queue, source, priority, batch_size).await?;
    let pending = queue.len().await?;
    queue.close().await?;

    if queued.is_empty() {
        println!("{}: every day is up to date", normalize_source(source));
    } else {
        for (day, id) in &queued {
            println!("queued #{id} {day}");
        }
        println!("{} days queued, {pending} tasks pending", queued.len());
    }
    Ok(())
}

/// Run the `chatlens queue` command.
pub async fn run_list(config: &ChatlensConfig) -> Result<(), ChatlensError> {
    let queue = AnalysisQueue::open(&config.storage.queue_path).await?;
    let pending = queue.pending().await?;
    queue.close().await?;

    if pending.is_empty() {
        println!("queue is empty");
        return Ok(());
    }
    println!(
        "{:>6}  {:>8}  {:<24}  {:<10}  {:>6}  {:>8}  enqueued",
        "id", "priority", "source", "day", "batch", "attempts"
    );
    for task in pending {
        let batch = task
            .batch_size
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "{:>6}  {:>8}  {:<24}  {:<10}  {:>6}  {:>8}  {}",
            task.id, task.priority, task.source, task.day, batch, task.attempts, task.enqueued_at
        );
    }
    Ok(())
}
