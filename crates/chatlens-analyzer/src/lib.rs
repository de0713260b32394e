// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch analysis pipeline for Chatlens.
//!
//! A transcript is split into bounded batches ([`batch`]), each batch is
//! rendered into a prompt ([`prompt`]) and sent to the completion service,
//! the JSON payload is pulled out of every reply ([`extract`]), discussions
//! from all batches are reconciled ([`merge`]), scored ([`metrics`]) and
//! their message links checked ([`links`]). [`AnalyzerService`] drives the
//! whole run and persists the result.

pub mod batch;
pub mod extract;
pub mod links;
pub mod merge;
pub mod metrics;
pub mod prompt;
pub mod service;

pub use batch::{TranscriptBatch, chunk};
pub use extract::{extract_json, parse_discussions};
pub use links::LinkValidator;
pub use merge::merge;
pub use metrics::{classify, compute_stats, enrich};
pub use prompt::{DEFAULT_TEMPLATE, MessageFormat, PromptBuilder};
pub use service::{AnalyzeOptions, AnalyzerService, PipelineState};
