// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis pub/sub transport.

use async_trait::async_trait;
use chatlens_config::BusConfig;
use chatlens_core::{ChatlensError, EventSource, FetchEvent};
use futures::StreamExt;
use futures::stream::BoxStream;
use redis::{AsyncCommands, IntoConnectionInfo};
use tracing::{debug, info, warn};

use crate::event::fetch_event_payload;

fn bus_err(message: &str, e: redis::RedisError) -> ChatlensError {
    ChatlensError::Bus {
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Redis-backed event bus bound to one channel.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    channel: String,
}

impl RedisBus {
    /// Builds the client. No connection is made until the first call.
    pub fn connect(config: &BusConfig) -> Result<Self, ChatlensError> {
        let mut info = config
            .redis_url
            .as_str()
            .into_connection_info()
            .map_err(|e| bus_err("invalid redis_url", e))?;
        if let Some(password) = config.redis_password.as_deref().filter(|p| !p.is_empty()) {
            info.redis.password = Some(password.to_string());
        }
        let client = redis::Client::open(info).map_err(|e| bus_err("invalid redis_url", e))?;
        Ok(Self {
            client,
            channel: config.channel.clone(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Subscribes to the configured channel.
    pub async fn subscribe(&self) -> Result<RedisSubscriber, ChatlensError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| bus_err("cannot connect to redis", e))?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| bus_err("subscribe failed", e))?;
        info!(channel = %self.channel, "subscribed to event channel");
        Ok(RedisSubscriber {
            messages: pubsub.into_on_message().boxed(),
            channel: self.channel.clone(),
        })
    }

    /// Publishes a raw payload. Returns the number of receivers.
    pub async fn publish(&self, payload: &str) -> Result<i64, ChatlensError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| bus_err("cannot connect to redis", e))?;
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| bus_err("publish failed", e))?;
        debug!(channel = %self.channel, receivers, "event published");
        Ok(receivers)
    }

    pub async fn publish_fetch_event(&self, event: &FetchEvent) -> Result<i64, ChatlensError> {
        self.publish(&fetch_event_payload(event)?).await
    }
}

/// Live subscription to a Redis channel.
pub struct RedisSubscriber {
    messages: BoxStream<'static, redis::Msg>,
    channel: String,
}

#[async_trait]
impl EventSource for RedisSubscriber {
    async fn next_payload(&mut self) -> Result<Option<String>, ChatlensError> {
        loop {
            let Some(message) = self.messages.next().await else {
                info!(channel = %self.channel, "event subscription closed");
                return Ok(None);
            };
            match message.get_payload::<String>() {
                Ok(payload) => return Ok(Some(payload)),
                Err(e) => warn!(error = %e, "skipping non-text payload"),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChatlensError> {
        // Dropping the stream closes the pub/sub connection.
        self.messages = futures::stream::empty().boxed();
        info!(channel = %self.channel, "event subscription released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_applied_to_connection_info() {
        let config = BusConfig {
            redis_url: "redis://localhost:6379/2".into(),
            redis_password: Some("hunter2".into()),
            ..BusConfig::default()
        };
        let bus = RedisBus::connect(&config).unwrap();
        let info = bus.client.get_connection_info();
        assert_eq!(info.redis.password.as_deref(), Some("hunter2"));
        assert_eq!(info.redis.db, 2);
        assert_eq!(bus.channel(), "tg_events");
    }

    #[test]
    fn invalid_url_is_bus_error() {
        let config = BusConfig {
            redis_url: "not a url".into(),
            ..BusConfig::default()
        };
        let err = RedisBus::connect(&config).err().unwrap();
        assert_eq!(err.kind(), "bus");
    }
}
