// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatlens analyze` and `chatlens models`, plus service wiring shared by
//! the long-running commands.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chatlens_analyzer::{AnalyzeOptions, AnalyzerService, PromptBuilder};
use chatlens_config::ChatlensConfig;
use chatlens_core::{ChatlensError, CompletionProvider};
use chatlens_gigachat::GigaChatProvider;
use chatlens_storage::file_stores;

/// Command-line overrides of the configured analysis options.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeRequest {
    pub window: Option<usize>,
    pub batch_size: Option<usize>,
    pub single: bool,
    pub force: bool,
}

impl AnalyzeRequest {
    fn apply(self, mut options: AnalyzeOptions) -> AnalyzeOptions {
        if let Some(window) = self.window {
            options.window_size = window;
        }
        if self.single {
            options.batch_size = None;
        } else if let Some(batch_size) = self.batch_size {
            options.batch_size = NonZeroUsize::new(batch_size);
        }
        options.force = self.force;
        options
    }
}

/// Builds the analyzer over file storage and the GigaChat provider.
pub async fn build_service(config: &ChatlensConfig) -> Result<AnalyzerService, ChatlensError> {
    let (transcripts, results) = file_stores(&config.storage);
    let provider = GigaChatProvider::new(&config.gigachat)?;
    let prompts = PromptBuilder::from_config(&config.analysis).await?;
    Ok(AnalyzerService::new(
        Arc::new(transcripts),
        Arc::new(results),
        Arc::new(provider),
        prompts,
        config.analysis.clone(),
    ))
}

/// Run the `chatlens analyze` command.
pub async fn run_analyze(
    config: &ChatlensConfig,
    source: &str,
    day: &str,
    request: AnalyzeRequest,
) -> Result<(), ChatlensError> {
    let service = build_service(config).await?;
    let options = request.apply(service.default_options());
    let (result, metadata) = service.analyze(source, day, options).await?;

    println!(
        "{} {}: {} discussions from {}/{} messages ({} tokens, {:.1}s, model {})",
        metadata.source,
        metadata.day,
        result.discussions.len(),
        metadata.analyzed_messages,
        metadata.total_messages,
        metadata.tokens_used,
        metadata.latency_seconds,
        metadata.model
    );
    if !metadata.failed_batches.is_empty() {
        println!("failed batches: {:?}", metadata.failed_batches);
    }
    let (_, results) = file_stores(&config.storage);
    println!("{}", results.result_path(&metadata.source, day).display());
    Ok(())
}

/// Run the `chatlens models` command.
pub async fn run_models(config: &ChatlensConfig) -> Result<(), ChatlensError> {
    let provider = GigaChatProvider::new(&config.gigachat)?;
    let models = provider.list_models().await?;
    if models.is_empty() {
        println!("no models available");
    }
    for model in models {
        if model.id == config.gigachat.model {
            println!("* {} ({})", model.id, model.owned_by);
        } else {
            println!("  {} ({})", model.id, model.owned_by);
        }
    }
    Ok(())
}
