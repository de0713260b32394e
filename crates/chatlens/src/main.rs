// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatlens - daily discussion digests of Telegram chat transcripts.
//!
//! This is the binary entry point.

mod analyze;
mod queue;
mod serve;
mod show;

use std::path::PathBuf;

use chatlens_config::ChatlensConfig;
use clap::{Parser, Subcommand};
use tracing::error;

/// Chatlens - daily discussion digests of Telegram chat transcripts.
#[derive(Parser, Debug)]
#[command(name = "chatlens", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one source on one day.
    Analyze {
        /// Source handle, with or without a leading `@`.
        source: String,
        /// Day in YYYY-MM-DD form.
        day: String,
        /// Messages analyzed in single-window mode.
        #[arg(long)]
        window: Option<usize>,
        /// Messages per completion call.
        #[arg(long, conflicts_with = "single")]
        batch_size: Option<usize>,
        /// Analyze only the first window of messages in one call.
        #[arg(long)]
        single: bool,
        /// Re-analyze even when a result is stored.
        #[arg(long)]
        force: bool,
    },
    /// Analyze every day announced on the event bus.
    Daemon,
    /// Drain the analysis queue.
    Worker,
    /// Queue every day of a source whose result is missing or stale.
    Enqueue {
        source: String,
        /// Priority of the newest day; older days get lower priorities.
        #[arg(long, default_value_t = 10)]
        priority: i64,
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// List pending analysis tasks.
    Queue,
    /// List models offered by the completion service.
    Models,
    /// Print a stored analysis.
    Show { source: String, day: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chatlens_config::load_and_validate_path(path),
        None => chatlens_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatlens_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    if let Err(e) = run(cli.command, config).await {
        error!(error = %e, error_kind = e.kind(), "command failed");
        eprintln!("chatlens: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ChatlensConfig) -> Result<(), chatlens_core::ChatlensError> {
    match command {
        Commands::Analyze {
            source,
            day,
            window,
            batch_size,
            single,
            force,
        } => {
            let request = analyze::AnalyzeRequest {
                window,
                batch_size,
                single,
                force,
            };
            analyze::run_analyze(&config, &source, &day, request).await
        }
        Commands::Daemon => serve::run_daemon(&config).await,
        Commands::Worker => serve::run_worker(&config).await,
        Commands::Enqueue {
            source,
            priority,
            batch_size,
        } => queue::run_enqueue(&config, &source, priority, batch_size).await,
        Commands::Queue => queue::run_list(&config).await,
        Commands::Models => analyze::run_models(&config).await,
        Commands::Show { source, day } => show::run_show(&config, &source, &day).await,
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatlens={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
