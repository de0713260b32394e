// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatlens daemon` and `chatlens worker`.

use std::sync::Arc;

use chatlens_bus::RedisBus;
use chatlens_config::ChatlensConfig;
use chatlens_core::ChatlensError;
use chatlens_daemon::{EventTrigger, QueueWorker, install_signal_handler};
use chatlens_storage::AnalysisQueue;
use tracing::info;

use crate::analyze::build_service;

/// Run the `chatlens daemon` command.
///
/// Subscribes to the fetcher channel and analyzes every announced day
/// until SIGINT or SIGTERM.
pub async fn run_daemon(config: &ChatlensConfig) -> Result<(), ChatlensError> {
    let service = Arc::new(build_service(config).await?);
    let bus = RedisBus::connect(&config.bus)?;
    let subscription = bus.subscribe().await?;
    let cancel = install_signal_handler();

    info!(
        worker_id = %config.bus.worker_id,
        channel = %bus.channel(),
        "daemon listening for fetch events"
    );
    let stats = EventTrigger::new(service, &config.bus)
        .run(subscription, cancel)
        .await?;
    info!(
        analyzed = stats.analyzed,
        failed = stats.failed,
        malformed = stats.malformed,
        "daemon stopped"
    );
    Ok(())
}

/// Run the `chatlens worker` command.
pub async fn run_worker(config: &ChatlensConfig) -> Result<(), ChatlensError> {
    let service = Arc::new(build_service(config).await?);
    let queue = AnalysisQueue::open(&config.storage.queue_path).await?;
    let cancel = install_signal_handler();

    let processed = QueueWorker::new(queue.clone(), service, &config.worker)
        .run(cancel)
        .await?;
    queue.close().await?;
    info!(processed, "worker stopped");
    Ok(())
}
