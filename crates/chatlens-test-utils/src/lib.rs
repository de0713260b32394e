// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chatlens integration tests.
//!
//! Provides mock adapters and fixtures for fast, deterministic tests that
//! never reach the network or the filesystem.
//!
//! # Components
//!
//! - [`MockCompletion`] - scripted completion provider that records prompts
//! - [`MemoryTranscripts`] / [`MemoryResults`] - in-memory storage adapters
//! - [`fixtures`] - transcript and model-reply builders

pub mod fixtures;
pub mod memory_store;
pub mod mock_completion;

pub use memory_store::{MemoryResults, MemoryTranscripts};
pub use mock_completion::MockCompletion;
