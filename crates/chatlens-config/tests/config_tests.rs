// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Chatlens configuration system.

use chatlens_config::diagnostic::ConfigError;
use chatlens_config::model::ChatlensConfig;
use chatlens_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_chatlens_config() {
    let toml = r#"
[gigachat]
auth_key = "c2VjcmV0"
model = "GigaChat-Pro"
timeout_secs = 30
max_retries = 5
retry_delay_secs = 0.5
accept_invalid_certs = true

[storage]
data_path = "/srv/tg/data"
output_path = "/srv/tg/output"

[bus]
redis_url = "redis://cache:6379/1"
channel = "events"
buffer = 4

[analysis]
batch_size = 50
temperature = 0.2
validate_links = false

[worker]
poll_interval_secs = 2

[logging]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.gigachat.auth_key.as_deref(), Some("c2VjcmV0"));
    assert_eq!(config.gigachat.model, "GigaChat-Pro");
    assert_eq!(config.gigachat.timeout_secs, 30);
    assert_eq!(config.gigachat.max_retries, 5);
    assert_eq!(config.gigachat.retry_delay_secs, 0.5);
    assert!(config.gigachat.accept_invalid_certs);
    assert_eq!(config.storage.data_path, "/srv/tg/data");
    assert_eq!(config.storage.queue_path, "chatlens-queue.db");
    assert_eq!(config.bus.redis_url, "redis://cache:6379/1");
    assert_eq!(config.bus.channel, "events");
    assert_eq!(config.bus.buffer, 4);
    assert_eq!(config.analysis.batch_size, 50);
    assert_eq!(config.analysis.window_size, 30);
    assert!(!config.analysis.validate_links);
    assert_eq!(config.worker.poll_interval_secs, 2);
    assert_eq!(config.logging.level, "debug");
}

/// Serialized defaults provide sensible values for all fields.
#[test]
fn serialized_defaults_are_sensible() {
    let config = ChatlensConfig::default();

    assert!(config.gigachat.auth_key.is_none());
    assert_eq!(
        config.gigachat.oauth_url,
        "https://ngw.devices.sberbank.ru:9443/api/v2/oauth"
    );
    assert_eq!(
        config.gigachat.base_url,
        "https://gigachat.devices.sberbank.ru/api/v1"
    );
    assert_eq!(config.gigachat.scope, "GIGACHAT_API_PERS");
    assert_eq!(config.gigachat.model, "GigaChat");
    assert_eq!(config.gigachat.timeout_secs, 60);
    assert_eq!(config.gigachat.max_retries, 3);
    assert_eq!(config.gigachat.retry_delay_secs, 1.0);
    assert_eq!(config.bus.channel, "tg_events");
    assert_eq!(config.bus.buffer, 16);
    assert_eq!(config.analysis.window_size, 30);
    assert_eq!(config.analysis.batch_size, 100);
    assert_eq!(config.analysis.max_tokens, 8192);
    assert_eq!(config.analysis.batch_pause_ms, 1000);
    assert_eq!(config.analysis.min_response_chars, 1000);
    assert_eq!(config.analysis.link_host, "https://t.me");
    assert_eq!(config.worker.poll_interval_secs, 5);
    assert_eq!(config.logging.level, "info");
}

/// Unknown field in [gigachat] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[gigachat]
modle = "GigaChat-Max"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { section, key, suggestion, valid_keys, span, .. } if {
            section == "gigachat"
                && key == "modle"
                && suggestion.as_deref() == Some("model")
                && valid_keys.contains("base_url")
                && span.is_some_and(|s| &toml[s.offset()..s.offset() + s.len()] == "modle")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'modle' with suggestion 'model', got: {errors:?}"
    );
}

/// A section key written at the root is reported with the section that owns it.
#[test]
fn root_level_key_points_at_owning_section() {
    use miette::Diagnostic;

    let toml = "redis_url = \"redis://cache:6379\"\n";

    let errors = load_and_validate_str(toml).expect_err("should reject root key");
    let error = errors
        .iter()
        .find(|e| matches!(e, ConfigError::UnknownSection { section, .. } if section == "redis_url"))
        .unwrap_or_else(|| panic!("no UnknownSection error, got: {errors:?}"));
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("key of [bus]"), "got: {help}");
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown section");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telegram"),
        "got: {err_str}"
    );
}

/// Invalid type (string where number expected) produces an InvalidType diagnostic.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[analysis]
batch_size = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("batch_size"))),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after successful deserialization.
#[test]
fn validation_catches_zero_buffer() {
    let toml = r#"
[bus]
buffer = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("bus.buffer"))
    ));
}

/// CHATLENS_* variables map onto sections without splitting key names.
#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "chatlens.toml",
            r#"
[gigachat]
model = "from-file"

[analysis]
batch_size = 10
"#,
        )?;
        jail.set_env("CHATLENS_GIGACHAT_AUTH_KEY", "from-env");
        jail.set_env("CHATLENS_ANALYSIS_BATCH_SIZE", "25");
        jail.set_env("CHATLENS_BUS_REDIS_URL", "redis://other:6379");

        let config = chatlens_config::load_config_from_path(std::path::Path::new(
            "chatlens.toml",
        ))?;
        assert_eq!(config.gigachat.model, "from-file");
        assert_eq!(config.gigachat.auth_key.as_deref(), Some("from-env"));
        assert_eq!(config.analysis.batch_size, 25);
        assert_eq!(config.bus.redis_url, "redis://other:6379");
        Ok(())
    });
}

/// GIGACHAT_AUTH_KEY is honored, and the prefixed variable wins over it.
#[test]
fn legacy_auth_key_variable_is_honored() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("chatlens.toml", "")?;
        jail.set_env("GIGACHAT_AUTH_KEY", "legacy");

        let path = std::path::Path::new("chatlens.toml");
        let config = chatlens_config::load_config_from_path(path)?;
        assert_eq!(config.gigachat.auth_key.as_deref(), Some("legacy"));

        jail.set_env("CHATLENS_GIGACHAT_AUTH_KEY", "prefixed");
        let config = chatlens_config::load_config_from_path(path)?;
        assert_eq!(config.gigachat.auth_key.as_deref(), Some("prefixed"));
        Ok(())
    });
}

/// A missing explicit config file is reported, not silently defaulted.
#[test]
fn missing_explicit_file_is_an_error() {
    let errors = chatlens_config::load_and_validate_path(std::path::Path::new(
        "/nonexistent/chatlens.toml",
    ))
    .expect_err("missing file should be reported");
    assert!(matches!(&errors[0], ConfigError::Other(msg) if msg.contains("does not exist")));
}

/// ConfigError renders through miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        section: "bus".to_string(),
        key: "chanel".to_string(),
        suggestion: Some("channel".to_string()),
        valid_keys: "redis_url, redis_password, channel, buffer, worker_id".to_string(),
        span: None,
        src: None,
    };

    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `channel`"), "got: {help}");
    assert!(help.contains("CHATLENS_BUS_REDIS_PASSWORD"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("chanel"));
}
