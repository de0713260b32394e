// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chatlens analyzer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Chatlens configuration.
///
/// Every section is optional and defaults to values that work against the
/// public GigaChat endpoints and a local Redis.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatlensConfig {
    /// Completion service credentials and transport settings.
    #[serde(default)]
    pub gigachat: GigaChatConfig,

    /// Transcript, result and queue locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pub/sub bus settings for daemon mode.
    #[serde(default)]
    pub bus: BusConfig,

    /// Batching and prompting parameters.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Queue worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GigaChat API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GigaChatConfig {
    /// Pre-encoded Basic authorization secret. Falls back to `GIGACHAT_AUTH_KEY`.
    #[serde(default)]
    pub auth_key: Option<String>,

    /// Client id, combined with `client_secret` when `auth_key` is absent.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per call, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,

    /// Skip TLS certificate verification (the public endpoints use a
    /// national root CA that is often missing from system stores).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            auth_key: None,
            client_id: None,
            client_secret: None,
            oauth_url: default_oauth_url(),
            base_url: default_base_url(),
            scope: default_scope(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            accept_invalid_certs: false,
        }
    }
}

fn default_oauth_url() -> String {
    "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string()
}

fn default_base_url() -> String {
    "https://gigachat.devices.sberbank.ru/api/v1".to_string()
}

fn default_scope() -> String {
    "GIGACHAT_API_PERS".to_string()
}

fn default_model() -> String {
    "GigaChat".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

/// Storage locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root of the `<source>/<day>.json` transcript tree.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Root of the `<source>/<day>.json` result tree.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// SQLite database backing the work queue.
    #[serde(default = "default_queue_path")]
    pub queue_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            output_path: default_output_path(),
            queue_path: default_queue_path(),
        }
    }
}

fn default_data_path() -> String {
    "../python-tg/data".to_string()
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_queue_path() -> String {
    "chatlens-queue.db".to_string()
}

/// Pub/sub bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default)]
    pub redis_password: Option<String>,

    /// Channel the fetcher publishes `messages_fetched` events on.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Capacity of the listener-to-pipeline channel.
    #[serde(default = "default_buffer")]
    pub buffer: usize,

    /// Identifier this process reports in logs.
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            redis_password: None,
            channel: default_channel(),
            buffer: default_buffer(),
            worker_id: default_worker_id(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_channel() -> String {
    "tg_events".to_string()
}

fn default_buffer() -> usize {
    16
}

fn default_worker_id() -> String {
    "analyzer-1".to_string()
}

/// Analysis pipeline parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Messages analyzed in legacy window mode.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Messages per batch. `0` selects legacy window mode.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Pause between consecutive completion calls of one run.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Replies shorter than this are logged as suspect.
    #[serde(default = "default_min_response_chars")]
    pub min_response_chars: usize,

    /// Host part of generated message links.
    #[serde(default = "default_link_host")]
    pub link_host: String,

    #[serde(default = "default_true")]
    pub validate_links: bool,

    /// Path to a prompt template file replacing the built-in one.
    #[serde(default)]
    pub prompt_template: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            batch_size: default_batch_size(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            batch_pause_ms: default_batch_pause_ms(),
            min_response_chars: default_min_response_chars(),
            link_host: default_link_host(),
            validate_links: true,
            prompt_template: None,
        }
    }
}

fn default_window_size() -> usize {
    30
}

fn default_batch_size() -> usize {
    100
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_batch_pause_ms() -> u64 {
    1000
}

fn default_min_response_chars() -> usize {
    1000
}

fn default_link_host() -> String {
    "https://t.me".to_string()
}

fn default_true() -> bool {
    true
}

/// Queue worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Seconds to sleep when the queue is empty.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
