// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end analysis of one source-day.
//!
//! A run walks through: Idle -> Checked -> Loading -> Batching ->
//! Completing(i/n) -> Parsing(i/n) -> Merging -> Enriching -> Validating ->
//! Saving -> Done. A recoverable failure while completing or parsing a batch
//! moves that batch to `Failed(i)` and the run continues with the next one.
//!
//! Batches are processed strictly one after another with a pause between
//! completion calls, so merge order is the batch order.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chatlens_config::AnalysisConfig;
use chatlens_core::{
    AnalysisMetadata, AnalysisResult, ChatlensError, CompletionProvider, CompletionRequest,
    ResultStore, TranscriptSource, normalize_source,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::batch::{TranscriptBatch, chunk};
use crate::extract::{is_suspect, parse_discussions};
use crate::links::LinkValidator;
use crate::merge::merge;
use crate::metrics::{compute_stats, enrich};
use crate::prompt::PromptBuilder;

/// States of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Checked for a stored result.
    Checked { existing: bool },
    Loading,
    Batching,
    /// Waiting on the completion call of batch `batch` of `total` (1-based).
    Completing { batch: usize, total: usize },
    Parsing { batch: usize, total: usize },
    /// Batch `batch` (1-based) contributed no discussions.
    Failed { batch: usize },
    Merging,
    Enriching,
    Validating,
    Saving,
    Done,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Checked { existing } => write!(f, "checked(existing={existing})"),
            PipelineState::Loading => write!(f, "loading"),
            PipelineState::Batching => write!(f, "batching"),
            PipelineState::Completing { batch, total } => write!(f, "completing({batch}/{total})"),
            PipelineState::Parsing { batch, total } => write!(f, "parsing({batch}/{total})"),
            PipelineState::Failed { batch } => write!(f, "failed(batch={batch})"),
            PipelineState::Merging => write!(f, "merging"),
            PipelineState::Enriching => write!(f, "enriching"),
            PipelineState::Validating => write!(f, "validating"),
            PipelineState::Saving => write!(f, "saving"),
            PipelineState::Done => write!(f, "done"),
        }
    }
}

/// Per-call options of [`AnalyzerService::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Messages analyzed in window mode.
    pub window_size: usize,
    /// Batch size; `None` selects window mode.
    pub batch_size: Option<NonZeroUsize>,
    /// Re-analyze even when a result is stored.
    pub force: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            window_size: 30,
            batch_size: NonZeroUsize::new(100),
            force: false,
        }
    }
}

impl AnalyzeOptions {
    /// Options from the `[analysis]` section; `batch_size = 0` selects window mode.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            window_size: config.window_size,
            batch_size: NonZeroUsize::new(config.batch_size),
            force: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Drives the batch pipeline for one (source, day) at a time.
pub struct AnalyzerService {
    transcripts: Arc<dyn TranscriptSource>,
    results: Arc<dyn ResultStore>,
    provider: Arc<dyn CompletionProvider>,
    prompts: PromptBuilder,
    validator: LinkValidator,
    config: AnalysisConfig,
}

impl AnalyzerService {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        results: Arc<dyn ResultStore>,
        provider: Arc<dyn CompletionProvider>,
        prompts: PromptBuilder,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            transcripts,
            results,
            provider,
            prompts,
            validator: LinkValidator::new(config.link_host.clone()),
            config,
        }
    }

    /// Default options derived from the configuration.
    pub fn default_options(&self) -> AnalyzeOptions {
        AnalyzeOptions::from_config(&self.config)
    }

    pub fn results(&self) -> &Arc<dyn ResultStore> {
        &self.results
    }

    fn transition(&self, state: PipelineState) {
        debug!(state = %state, "pipeline state");
    }

    /// Analyzes `source` on `day` and persists the result.
    ///
    /// Without `force`, a stored result is returned unchanged and no
    /// completion call is made. A missing transcript aborts before any
    /// network traffic. Batches that fail with a recoverable error are listed
    /// in `failed_batches` and the result is saved even when all of them failed.
    pub async fn analyze(
        &self,
        source: &str,
        day: &str,
        options: AnalyzeOptions,
    ) -> Result<(AnalysisResult, AnalysisMetadata), ChatlensError> {
        let source = normalize_source(source);
        self.transition(PipelineState::Idle);

        if !options.force {
            let existing = self.results.exists(source, day).await?;
            self.transition(PipelineState::Checked { existing });
            if existing {
                if let Some(stored) = self.results.load(source, day).await? {
                    info!(source, day, "analysis already exists, skipping");
                    return Ok(stored);
                }
            }
        }

        self.transition(PipelineState::Loading);
        let transcript = self.transcripts.load(source, day).await?;
        transcript
            .validate()
            .map_err(ChatlensError::DataValidation)?;
        let username = transcript.source_info.link_username();
        let total_messages = transcript.messages.len();
        info!(source, day, messages = total_messages, "transcript loaded");

        self.transition(PipelineState::Batching);
        let (batches, analyzed_messages) = match options.batch_size {
            Some(size) => (chunk(&transcript.messages, size), total_messages),
            None => {
                let window = options.window_size.min(total_messages);
                let batches = match NonZeroUsize::new(window) {
                    Some(size) => chunk(&transcript.messages[..window], size),
                    None => Vec::new(),
                };
                (batches, window)
            }
        };
        let total = batches.len();
        info!(
            source,
            day,
            batches = total,
            mode = if options.batch_size.is_some() { "batch" } else { "window" },
            "analysis started"
        );

        let pause = Duration::from_millis(self.config.batch_pause_ms);
        let mut collected = Vec::new();
        let mut failed_batches = Vec::new();
        let mut tokens_used = 0u64;
        let mut latency = Duration::ZERO;
        let mut model = None;

        for batch in &batches {
            if batch.index > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            let ordinal = batch.index + 1;

            let prompt = self.prompts.build(&transcript, &username, day, batch.messages)?;
            self.transition(PipelineState::Completing {
                batch: ordinal,
                total,
            });
            let started = Instant::now();
            let outcome = self
                .provider
                .complete(CompletionRequest {
                    prompt,
                    temperature: self.config.temperature,
                    max_tokens: Some(self.config.max_tokens),
                })
                .await;
            let elapsed = started.elapsed();
            latency += elapsed;

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    self.skip_batch(batch, e, &mut failed_batches)?;
                    continue;
                }
            };
            tokens_used += response.tokens_used;
            info!(
                batch = ordinal,
                total,
                tokens = response.tokens_used,
                latency_ms = elapsed.as_millis() as u64,
                "batch completed"
            );
            if is_suspect(&response.text, self.config.min_response_chars) {
                warn!(
                    batch = ordinal,
                    chars = response.text.chars().count(),
                    "suspiciously short model reply"
                );
            }
            model = Some(response.model);

            self.transition(PipelineState::Parsing {
                batch: ordinal,
                total,
            });
            match parse_discussions(&response.text) {
                Ok(found) => {
                    debug!(batch = ordinal, discussions = found.len(), "batch parsed");
                    collected.extend(found);
                }
                Err(e) => self.skip_batch(batch, e, &mut failed_batches)?,
            }
        }

        if total > 0 && failed_batches.len() == total {
            warn!(source, day, batches = total, "every batch failed, saving an empty result");
        }

        self.transition(PipelineState::Merging);
        let found = collected.len();
        let mut discussions = merge(collected);
        debug!(found, merged = discussions.len(), "discussions merged");

        self.transition(PipelineState::Enriching);
        enrich(&mut discussions);
        let stats = compute_stats(&discussions);

        if self.config.validate_links {
            self.transition(PipelineState::Validating);
            let analyzed_ids: HashSet<i64> = batches
                .iter()
                .flat_map(|b| b.messages.iter().map(|m| m.id))
                .collect();
            if let Err(err) = self.validator.check(&discussions, &username, &analyzed_ids) {
                warn!(error_kind = err.kind(), "{err}");
                if let ChatlensError::Validation { violations } = &err {
                    for violation in violations {
                        warn!(violation = %violation, "invalid message link");
                    }
                }
            }
        }

        let result = AnalysisResult { discussions };
        let metadata = AnalysisMetadata {
            source: source.to_string(),
            source_username: username,
            day: day.to_string(),
            produced_at: Utc::now(),
            total_messages,
            analyzed_messages,
            tokens_used,
            model: model.unwrap_or_else(|| self.provider.name().to_string()),
            latency_seconds: latency.as_secs_f64(),
            failed_batches,
            discussion_stats: Some(stats),
        };

        self.transition(PipelineState::Saving);
        let location = self.results.save(source, day, &result, &metadata).await?;
        self.transition(PipelineState::Done);
        info!(
            source,
            day,
            discussions = result.discussions.len(),
            tokens = tokens_used,
            failed = metadata.failed_batches.len(),
            location = %location,
            "analysis saved"
        );

        Ok((result, metadata))
    }

    /// Records a recoverable batch failure, or hands any other error back.
    fn skip_batch(
        &self,
        batch: &TranscriptBatch<'_>,
        error: ChatlensError,
        failed: &mut Vec<usize>,
    ) -> Result<(), ChatlensError> {
        if !error.is_batch_recoverable() {
            return Err(error);
        }
        self.transition(PipelineState::Failed {
            batch: batch.index + 1,
        });
        warn!(
            batch = batch.index + 1,
            error_kind = error.kind(),
            error = %error,
            "batch skipped"
        );
        failed.push(batch.index);
        Ok(())
    }
}
