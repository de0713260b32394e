// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trigger and worker tests over the in-process bus, in-memory stores and
//! a scratch SQLite queue.

use std::sync::Arc;
use std::time::Duration;

use chatlens_analyzer::{AnalyzerService, PromptBuilder};
use chatlens_bus::InProcessBus;
use chatlens_config::{AnalysisConfig, BusConfig, WorkerConfig};
use chatlens_core::{FetchEvent, ResultStore, TaskStatus};
use chatlens_daemon::{EventTrigger, QueueWorker, TaskOutcome};
use chatlens_storage::AnalysisQueue;
use chatlens_test_utils::fixtures::{self, FIRST_MESSAGE_ID};
use chatlens_test_utils::{MemoryResults, MemoryTranscripts, MockCompletion};
use tokio_util::sync::CancellationToken;

const DAY: &str = "2025-03-01";

struct Fixture {
    transcripts: MemoryTranscripts,
    results: MemoryResults,
    provider: MockCompletion,
    service: Arc<AnalyzerService>,
}

fn fixture() -> Fixture {
    let transcripts = MemoryTranscripts::new();
    let results = MemoryResults::new();
    let provider = MockCompletion::new();
    let service = Arc::new(AnalyzerService::new(
        Arc::new(transcripts.clone()),
        Arc::new(results.clone()),
        Arc::new(provider.clone()),
        PromptBuilder::default(),
        AnalysisConfig {
            batch_pause_ms: 0,
            ..AnalysisConfig::default()
        },
    ));
    Fixture {
        transcripts,
        results,
        provider,
        service,
    }
}

fn fetched(source: &str, correlation_id: &str) -> FetchEvent {
    FetchEvent {
        source: source.to_string(),
        day: DAY.to_string(),
        message_count: Some(20),
        file_path: None,
        duration_seconds: Some(1.5),
        timestamp: None,
        correlation_id: correlation_id.to_string(),
    }
}

#[tokio::test]
async fn trigger_reanalyzes_on_every_fetch_event() {
    let f = fixture();
    f.transcripts
        .insert("ru_python", DAY, fixtures::transcript("ru_python", 20))
        .await;
    f.provider
        .push_reply(fixtures::discussion_reply(
            "ru_python",
            &[("Async runtimes", &[FIRST_MESSAGE_ID][..])],
        ))
        .await;

    let bus = InProcessBus::new(16);
    let subscription = bus.subscribe();
    bus.publish_fetch_event(&fetched("ru_python", "cid-1")).unwrap();
    bus.publish_fetch_event(&fetched("@ru_python", "cid-2")).unwrap();
    drop(bus);

    let trigger = EventTrigger::new(Arc::clone(&f.service), &BusConfig::default());
    let stats = trigger
        .run(subscription, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.received, 2);
    assert_eq!(stats.analyzed, 2);
    assert_eq!(stats.failed, 0);
    // The second event re-analyzes although a result already exists.
    assert_eq!(f.provider.calls().await, 2);
    assert_eq!(f.results.save_count(), 2);
    assert!(f.results.exists("ru_python", DAY).await.unwrap());
}

#[tokio::test]
async fn trigger_drops_bad_and_unrelated_events() {
    let f = fixture();
    let bus = InProcessBus::new(16);
    let subscription = bus.subscribe();
    bus.publish("{not json");
    bus.publish(r#"{"event": "messages_fetched", "source": "ru_python"}"#);
    bus.publish(r#"{"event": "fetch_failed", "chat": "ru_python", "error": "flood wait"}"#);
    bus.publish(r#"{"event": "heartbeat"}"#);
    drop(bus);

    let trigger = EventTrigger::new(Arc::clone(&f.service), &BusConfig::default());
    let stats = trigger
        .run(subscription, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.received, 4);
    assert_eq!(stats.malformed, 2);
    assert_eq!(stats.ignored, 2);
    assert_eq!(stats.analyzed, 0);
    assert_eq!(f.provider.calls().await, 0);
}

#[tokio::test]
async fn failed_analysis_does_not_stop_the_trigger() {
    let f = fixture();
    f.transcripts
        .insert("devops_ru", DAY, fixtures::transcript("devops_ru", 10))
        .await;

    let bus = InProcessBus::new(16);
    let subscription = bus.subscribe();
    bus.publish_fetch_event(&fetched("missing_chat", "cid-1")).unwrap();
    bus.publish_fetch_event(&fetched("devops_ru", "cid-2")).unwrap();
    drop(bus);

    let trigger = EventTrigger::new(Arc::clone(&f.service), &BusConfig::default());
    let stats = trigger
        .run(subscription, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.analyzed, 1);
    // The missing transcript is detected before any completion call.
    assert_eq!(f.provider.calls().await, 1);
}

#[tokio::test]
async fn cancellation_stops_an_idle_trigger() {
    let f = fixture();
    let bus = InProcessBus::new(4);
    let subscription = bus.subscribe();
    let cancel = CancellationToken::new();

    let trigger = EventTrigger::new(Arc::clone(&f.service), &BusConfig::default());
    let handle = tokio::spawn(trigger.run(subscription, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("trigger should stop")
        .unwrap()
        .unwrap();
    assert_eq!(stats.received, 0);
    drop(bus);
}

async fn scratch_queue() -> (tempfile::TempDir, AnalysisQueue) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");
    let queue = AnalysisQueue::open(path.to_str().unwrap()).await.unwrap();
    (dir, queue)
}

#[tokio::test]
async fn worker_runs_highest_priority_task_first() {
    let f = fixture();
    for source in ["low_chat", "high_chat"] {
        f.transcripts
            .insert(source, DAY, fixtures::transcript(source, 10))
            .await;
    }
    let (_dir, queue) = scratch_queue().await;
    queue.enqueue("low_chat", DAY, 1, None).await.unwrap();
    let high = queue.enqueue("high_chat", DAY, 9, None).await.unwrap();

    let worker = QueueWorker::new(queue.clone(), Arc::clone(&f.service), &WorkerConfig::default());
    let outcome = worker.run_once().await.unwrap().unwrap();
    assert_eq!(
        outcome,
        TaskOutcome::Completed {
            id: high,
            discussions: 0
        }
    );
    assert_eq!(
        queue.get(high).await.unwrap().unwrap().status,
        TaskStatus::Completed
    );
    assert_eq!(queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn worker_records_failures_on_the_task() {
    let f = fixture();
    let (_dir, queue) = scratch_queue().await;
    let id = queue.enqueue("missing_chat", DAY, 0, None).await.unwrap();

    let worker = QueueWorker::new(queue.clone(), Arc::clone(&f.service), &WorkerConfig::default());
    let outcome = worker.run_once().await.unwrap().unwrap();
    assert!(matches!(outcome, TaskOutcome::Failed { id: failed, .. } if failed == id));

    let task = queue.get(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.last_error.unwrap().contains("missing_chat"));
    assert!(worker.run_once().await.unwrap().is_none());
}

#[tokio::test]
async fn task_batch_size_zero_selects_window_mode() {
    let f = fixture();
    f.transcripts
        .insert("ru_python", DAY, fixtures::transcript("ru_python", 250))
        .await;
    let (_dir, queue) = scratch_queue().await;
    queue.enqueue("ru_python", DAY, 0, Some(0)).await.unwrap();

    let worker = QueueWorker::new(queue, Arc::clone(&f.service), &WorkerConfig::default());
    worker.run_once().await.unwrap().unwrap();

    assert_eq!(f.provider.calls().await, 1);
    let (_, metadata) = f.results.load("ru_python", DAY).await.unwrap().unwrap();
    assert_eq!(metadata.total_messages, 250);
    assert_eq!(metadata.analyzed_messages, 30);
}

#[tokio::test]
async fn worker_loop_drains_queue_until_cancelled() {
    let f = fixture();
    f.transcripts
        .insert("ru_python", DAY, fixtures::transcript("ru_python", 10))
        .await;
    let (_dir, queue) = scratch_queue().await;
    let id = queue.enqueue("ru_python", DAY, 0, None).await.unwrap();

    let worker = QueueWorker::new(
        queue.clone(),
        Arc::clone(&f.service),
        &WorkerConfig {
            poll_interval_secs: 1,
        },
    );
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let task = queue.get(id).await.unwrap().unwrap();
        if task.status == TaskStatus::Completed {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "task never completed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();

    let processed = handle.await.unwrap().unwrap();
    assert_eq!(processed, 1);
}

#[tokio::test]
async fn cancelled_worker_takes_no_tasks() {
    let f = fixture();
    let (_dir, queue) = scratch_queue().await;
    queue.enqueue("ru_python", DAY, 0, None).await.unwrap();

    let worker = QueueWorker::new(queue.clone(), Arc::clone(&f.service), &WorkerConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(worker.run(cancel).await.unwrap(), 0);
    assert_eq!(queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn worker_keeps_polling_after_queue_errors() {
    let f = fixture();
    f.transcripts
        .insert("ru_python", DAY, fixtures::transcript("ru_python", 10))
        .await;
    let (dir, queue) = scratch_queue().await;
    let path = dir.path().join("queue.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("DROP TABLE analysis_queue;")
        .unwrap();

    let worker = QueueWorker::new(
        queue.clone(),
        Arc::clone(&f.service),
        &WorkerConfig {
            poll_interval_secs: 1,
        },
    );
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!handle.is_finished(), "worker exited on a queue error");

    // Reopening recreates the schema.
    let restored = AnalysisQueue::open(path.to_str().unwrap()).await.unwrap();
    let id = restored.enqueue("ru_python", DAY, 0, None).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let task = restored.get(id).await.unwrap().unwrap();
        if task.status == TaskStatus::Completed {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "task never completed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();

    assert_eq!(handle.await.unwrap().unwrap(), 1);
}
