// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event source trait for pub/sub subscriptions.

use async_trait::async_trait;

use crate::error::ChatlensError;

/// A subscription that yields raw event payloads.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next payload. `Ok(None)` means the subscription ended.
    async fn next_payload(&mut self) -> Result<Option<String>, ChatlensError>;

    /// Releases the subscription.
    async fn close(&mut self) -> Result<(), ChatlensError> {
        Ok(())
    }
}
