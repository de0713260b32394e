// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams of the analysis pipeline.

pub mod completion;
pub mod events;
pub mod storage;

pub use completion::CompletionProvider;
pub use events::EventSource;
pub use storage::{ResultStore, TranscriptSource};
