// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process bus over a tokio broadcast channel.

use async_trait::async_trait;
use chatlens_core::{ChatlensError, EventSource, FetchEvent};
use tokio::sync::broadcast;
use tracing::warn;

use crate::event::fetch_event_payload;

/// Broadcast bus for single-process deployments and tests.
#[derive(Clone)]
pub struct InProcessBus {
    sender: broadcast::Sender<String>,
}

impl InProcessBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a raw payload. Returns the number of subscribers reached.
    pub fn publish(&self, payload: impl Into<String>) -> usize {
        // No subscribers is not an error for a pub/sub channel.
        self.sender.send(payload.into()).unwrap_or(0)
    }

    pub fn publish_fetch_event(&self, event: &FetchEvent) -> Result<usize, ChatlensError> {
        Ok(self.publish(fetch_event_payload(event)?))
    }

    pub fn subscribe(&self) -> InProcessSubscriber {
        InProcessSubscriber {
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct InProcessSubscriber {
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl EventSource for InProcessSubscriber {
    async fn next_payload(&mut self) -> Result<Option<String>, ChatlensError> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Ok(Some(payload)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn every_subscriber_sees_each_payload() {
        let bus = InProcessBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.publish("one"), 2);

        assert_eq!(a.next_payload().await.unwrap().as_deref(), Some("one"));
        assert_eq!(b.next_payload().await.unwrap().as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = InProcessBus::new(8);
        assert_eq!(bus.publish("lost"), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn lagging_subscriber_skips_to_retained_events() {
        let bus = InProcessBus::new(2);
        let mut sub = bus.subscribe();
        for i in 0..5 {
            bus.publish(format!("e{i}"));
        }
        assert_eq!(sub.next_payload().await.unwrap().as_deref(), Some("e3"));
        assert_eq!(sub.next_payload().await.unwrap().as_deref(), Some("e4"));
        assert!(logs_contain("subscriber lagged behind"));
    }

    #[tokio::test]
    async fn dropping_the_bus_ends_the_subscription() {
        let bus = InProcessBus::new(4);
        let mut sub = bus.subscribe();
        bus.publish("last");
        drop(bus);
        assert_eq!(sub.next_payload().await.unwrap().as_deref(), Some("last"));
        assert_eq!(sub.next_payload().await.unwrap(), None);
    }
}
