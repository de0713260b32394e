// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event bus for Chatlens.
//!
//! Fetchers announce new transcripts as JSON payloads on a pub/sub channel.
//! [`event::decode`] turns a payload into a [`BusEvent`]; the transports
//! ([`InProcessBus`], [`RedisBus`]) hand out [`EventSource`] subscriptions.
//!
//! [`EventSource`]: chatlens_core::EventSource

pub mod event;
pub mod memory;
pub mod redis_bus;

pub use event::{BusEvent, FETCH_FAILED, MESSAGES_FETCHED, decode, fetch_event_payload};
pub use memory::{InProcessBus, InProcessSubscriber};
pub use redis_bus::{RedisBus, RedisSubscriber};
