// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event-triggered analysis.
//!
//! A listener task reads payloads from the subscription and forwards
//! decoded `messages_fetched` events over a bounded channel to a single
//! pipeline task, which analyzes them one at a time with `force = true`.
//! A slow analysis applies backpressure to the listener once the channel
//! is full.

use std::sync::Arc;

use chatlens_analyzer::AnalyzerService;
use chatlens_config::BusConfig;
use chatlens_core::{ChatlensError, EventSource, FetchEvent};
use chatlens_bus::{BusEvent, decode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Counters reported when the trigger stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerStats {
    /// Payloads read from the subscription.
    pub received: u64,
    /// Payloads that could not be decoded.
    pub malformed: u64,
    /// `fetch_failed` and unrelated events.
    pub ignored: u64,
    pub analyzed: u64,
    pub failed: u64,
}

/// Runs the analyzer for every `messages_fetched` event.
pub struct EventTrigger {
    service: Arc<AnalyzerService>,
    buffer: usize,
    worker_id: String,
}

impl EventTrigger {
    pub fn new(service: Arc<AnalyzerService>, config: &BusConfig) -> Self {
        Self {
            service,
            buffer: config.buffer.max(1),
            worker_id: config.worker_id.clone(),
        }
    }

    /// Consumes `events` until the subscription ends or `cancel` fires.
    ///
    /// On cancellation the listener stops reading and releases the
    /// subscription; the pipeline finishes the analysis it is running and
    /// exits without starting queued ones.
    pub async fn run<S>(
        self,
        events: S,
        cancel: CancellationToken,
    ) -> Result<TriggerStats, ChatlensError>
    where
        S: EventSource + 'static,
    {
        info!(worker_id = %self.worker_id, buffer = self.buffer, "event trigger started");
        let (tx, rx) = mpsc::channel(self.buffer);

        let listener = tokio::spawn(listen(events, tx, cancel.clone()));
        let pipeline = tokio::spawn(process(Arc::clone(&self.service), rx, cancel));

        let (listened, processed) = tokio::join!(listener, pipeline);
        let listened = listened.map_err(|e| ChatlensError::Internal(format!("listener task: {e}")))?;
        let processed =
            processed.map_err(|e| ChatlensError::Internal(format!("pipeline task: {e}")))?;

        let mut stats = listened?;
        stats.analyzed = processed.analyzed;
        stats.failed = processed.failed;
        info!(
            worker_id = %self.worker_id,
            received = stats.received,
            analyzed = stats.analyzed,
            failed = stats.failed,
            "event trigger stopped"
        );
        Ok(stats)
    }
}

async fn listen<S: EventSource>(
    mut events: S,
    tx: mpsc::Sender<FetchEvent>,
    cancel: CancellationToken,
) -> Result<TriggerStats, ChatlensError> {
    let mut stats = TriggerStats::default();

    let outcome = loop {
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("listener shutting down");
                break Ok(());
            }
            next = events.next_payload() => next,
        };

        let payload = match payload {
            Ok(Some(payload)) => payload,
            Ok(None) => break Ok(()),
            Err(e) => {
                error!(error = %e, error_kind = e.kind(), "event subscription failed");
                break Err(e);
            }
        };
        stats.received += 1;

        match decode(&payload) {
            Ok(BusEvent::MessagesFetched(event)) => {
                info!(
                    correlation_id = %event.correlation_id,
                    source = %event.source,
                    day = %event.day,
                    message_count = event.message_count,
                    "messages_fetched received"
                );
                if tx.send(event).await.is_err() {
                    debug!("pipeline task gone, listener stopping");
                    break Ok(());
                }
            }
            Ok(BusEvent::FetchFailed {
                source,
                day,
                error,
                correlation_id,
            }) => {
                stats.ignored += 1;
                warn!(
                    correlation_id = %correlation_id,
                    source = source.as_deref().unwrap_or("unknown"),
                    day = day.as_deref().unwrap_or("unknown"),
                    error = error.as_deref().unwrap_or("unknown"),
                    "fetcher reported a failed fetch"
                );
            }
            Ok(BusEvent::Other { event }) => {
                stats.ignored += 1;
                warn!(event = %event, "ignoring unknown event type");
            }
            Err(e) => {
                stats.malformed += 1;
                error!(error = %e, "dropping malformed event");
            }
        }
    };

    if let Err(e) = events.close().await {
        warn!(error = %e, "failed to release event subscription");
    }
    outcome.map(|()| stats)
}

#[derive(Default)]
struct Processed {
    analyzed: u64,
    failed: u64,
}

async fn process(
    service: Arc<AnalyzerService>,
    mut rx: mpsc::Receiver<FetchEvent>,
    cancel: CancellationToken,
) -> Processed {
    let mut processed = Processed::default();
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(queued = rx.len(), "pipeline shutting down");
                break;
            }
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let span = info_span!(
            "analysis",
            correlation_id = %event.correlation_id,
            source = %event.source,
            day = %event.day
        );
        let options = service.default_options().forced();
        match service
            .analyze(&event.source, &event.day, options)
            .instrument(span.clone())
            .await
        {
            Ok((result, metadata)) => {
                processed.analyzed += 1;
                span.in_scope(|| {
                    info!(
                        discussions = result.discussions.len(),
                        tokens = metadata.tokens_used,
                        "analysis completed"
                    )
                });
            }
            Err(e) => {
                processed.failed += 1;
                span.in_scope(|| {
                    error!(error = %e, error_kind = e.kind(), "analysis failed")
                });
            }
        }
    }
    processed
}
