// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty URLs and bounded sampling temperature.

use crate::diagnostic::ConfigError;
use crate::model::ChatlensConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every violation found rather than stopping at the first one.
pub fn validate_config(config: &ChatlensConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    for (name, value) in [
        ("gigachat.oauth_url", &config.gigachat.oauth_url),
        ("gigachat.base_url", &config.gigachat.base_url),
        ("gigachat.model", &config.gigachat.model),
        ("gigachat.scope", &config.gigachat.scope),
        ("storage.data_path", &config.storage.data_path),
        ("storage.output_path", &config.storage.output_path),
        ("storage.queue_path", &config.storage.queue_path),
        ("bus.redis_url", &config.bus.redis_url),
        ("bus.channel", &config.bus.channel),
        ("analysis.link_host", &config.analysis.link_host),
    ] {
        if value.trim().is_empty() {
            fail(format!("{name} must not be empty"));
        }
    }

    for (name, value) in [
        ("gigachat.oauth_url", &config.gigachat.oauth_url),
        ("gigachat.base_url", &config.gigachat.base_url),
        ("analysis.link_host", &config.analysis.link_host),
    ] {
        let v = value.trim();
        if !v.is_empty() && !(v.starts_with("http://") || v.starts_with("https://")) {
            fail(format!("{name} `{v}` must be an http(s) URL"));
        }
    }

    if config.gigachat.max_retries < 1 {
        fail("gigachat.max_retries must be at least 1, got 0".to_string());
    }

    if config.gigachat.retry_delay_secs < 0.0 || !config.gigachat.retry_delay_secs.is_finite() {
        fail(format!(
            "gigachat.retry_delay_secs must be a non-negative number, got {}",
            config.gigachat.retry_delay_secs
        ));
    }

    if config.gigachat.timeout_secs == 0 {
        fail("gigachat.timeout_secs must be at least 1, got 0".to_string());
    }

    if config.analysis.window_size < 1 {
        fail("analysis.window_size must be at least 1, got 0".to_string());
    }

    if !(0.0..=2.0).contains(&config.analysis.temperature) {
        fail(format!(
            "analysis.temperature must be within [0, 2], got {}",
            config.analysis.temperature
        ));
    }

    if config.analysis.max_tokens == 0 {
        fail("analysis.max_tokens must be at least 1, got 0".to_string());
    }

    if config.bus.buffer < 1 {
        fail("bus.buffer must be at least 1, got 0".to_string());
    }

    let level = config.logging.level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
