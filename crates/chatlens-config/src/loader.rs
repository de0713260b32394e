// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatlens.toml` > `~/.config/chatlens/chatlens.toml`
//! > `/etc/chatlens/chatlens.toml`, with environment variable overrides via the
//! `CHATLENS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatlensConfig;

const SYSTEM_CONFIG: &str = "/etc/chatlens/chatlens.toml";
const LOCAL_CONFIG: &str = "chatlens.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatlens/chatlens.toml` (system-wide)
/// 3. `~/.config/chatlens/chatlens.toml` (user XDG config)
/// 4. `./chatlens.toml` (local directory)
/// 5. `GIGACHAT_AUTH_KEY`, then `CHATLENS_*` environment variables
pub fn load_config() -> Result<ChatlensConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<ChatlensConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatlensConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatlensConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatlensConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_auth_env())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatlensConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(legacy_auth_env())
        .merge(env_provider())
}

/// Path of the per-user config file, if a config directory exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("chatlens/chatlens.toml"))
}

/// Every file the loader reads, in merge order.
pub fn config_paths() -> Vec<std::path::PathBuf> {
    let mut paths = vec![std::path::PathBuf::from(SYSTEM_CONFIG)];
    paths.extend(user_config_path());
    paths.push(std::path::PathBuf::from(LOCAL_CONFIG));
    paths
}

/// `GIGACHAT_AUTH_KEY` is honored for compatibility with existing deployments.
fn legacy_auth_env() -> Env {
    Env::raw()
        .only(&["GIGACHAT_AUTH_KEY"])
        .map(|_| "gigachat.auth_key".into())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CHATLENS_GIGACHAT_AUTH_KEY` must map to `gigachat.auth_key`,
/// not `gigachat.auth.key`.
fn env_provider() -> Env {
    Env::prefixed("CHATLENS_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("gigachat_", "gigachat.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("bus_", "bus.", 1)
            .replacen("analysis_", "analysis.", 1)
            .replacen("worker_", "worker.", 1)
            .replacen("logging_", "logging.", 1);
        mapped.into()
    })
}
