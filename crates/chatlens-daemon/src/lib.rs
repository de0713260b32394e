// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running Chatlens runners.
//!
//! [`EventTrigger`] analyzes a source-day whenever the fetcher announces
//! it on the bus; [`QueueWorker`] drains the persistent work queue. Both
//! stop cooperatively on the token from [`install_signal_handler`].

pub mod shutdown;
pub mod trigger;
pub mod worker;

pub use shutdown::install_signal_handler;
pub use trigger::{EventTrigger, TriggerStats};
pub use worker::{QueueWorker, TaskOutcome};
