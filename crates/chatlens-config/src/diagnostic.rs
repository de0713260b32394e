// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostics for `chatlens.toml`.
//!
//! Figment reports a flat list of errors with a key path. Each one is mapped
//! back onto the chatlens section layout so the report names the section,
//! points at the offending line and suggests the closest known key. A key
//! written under the wrong header is pointed at the section that owns it.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Source name used for configuration passed as a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// Sections of `chatlens.toml` and the keys each one accepts.
pub const SECTIONS: &[(&str, &[&str])] = &[
    (
        "gigachat",
        &[
            "auth_key",
            "client_id",
            "client_secret",
            "oauth_url",
            "base_url",
            "scope",
            "model",
            "timeout_secs",
            "max_retries",
            "retry_delay_secs",
            "accept_invalid_certs",
        ],
    ),
    ("storage", &["data_path", "output_path", "queue_path"]),
    (
        "bus",
        &["redis_url", "redis_password", "channel", "buffer", "worker_id"],
    ),
    (
        "analysis",
        &[
            "window_size",
            "batch_size",
            "temperature",
            "max_tokens",
            "batch_pause_ms",
            "min_response_chars",
            "link_host",
            "validate_links",
            "prompt_template",
        ],
    ),
    ("worker", &["poll_interval_secs"]),
    ("logging", &["level"]),
];

const MIN_SIMILARITY: f64 = 0.8;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A top-level table or key that chatlens does not know.
    #[error("unknown section `{section}`")]
    #[diagnostic(
        code(chatlens::config::unknown_section),
        help("{}", section_help(section, suggestion.as_deref()))
    )]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        #[label("not a chatlens section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the enclosing section does not accept.
    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(
        code(chatlens::config::unknown_key),
        help("{}", key_help(section, key, suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        section: String,
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys of the section.
        valid_keys: String,
        #[label("not accepted here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(chatlens::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `analysis.batch_size`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(chatlens::config::missing_key),
        help("add `{key} = <value>` to chatlens.toml")
    )]
    MissingKey { key: String },

    /// A value parsed but breaks a constraint checked after loading.
    #[error("validation error: {message}")]
    #[diagnostic(code(chatlens::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(chatlens::config::other))]
    Other(String),
}

/// Keys accepted by `section`, if it is a chatlens section.
pub fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// The section that accepts `key`, if any.
pub fn owning_section(key: &str) -> Option<&'static str> {
    SECTIONS
        .iter()
        .find(|(_, keys)| keys.contains(&key))
        .map(|(name, _)| *name)
}

/// Most similar candidate by Jaro-Winkler score, if any is close enough.
pub fn closest_match<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
        .filter(|(score, _)| *score >= MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate)
}

fn section_help(section: &str, suggestion: Option<&str>) -> String {
    if let Some(owner) = owning_section(section) {
        return format!("`{section}` is a key of [{owner}]; move it under that header");
    }
    match suggestion {
        Some(s) => format!("did you mean [{s}]?"),
        None => {
            let names: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();
            format!("known sections: {}", names.join(", "))
        }
    }
}

fn key_help(section: &str, key: &str, suggestion: Option<&str>, valid_keys: &str) -> String {
    let mut help = match (suggestion, owning_section(key)) {
        (Some(s), _) => format!("did you mean `{s}`? [{section}] accepts: {valid_keys}"),
        (None, Some(owner)) => format!("`{key}` belongs in [{owner}]"),
        (None, None) => format!("[{section}] accepts: {valid_keys}"),
    };
    if let Some(note) = env_note(section) {
        help.push('\n');
        help.push_str(note);
    }
    help
}

/// Where secrets of a section can come from besides the file.
fn env_note(section: &str) -> Option<&'static str> {
    match section {
        "gigachat" => {
            Some("credentials can also be set with CHATLENS_GIGACHAT_AUTH_KEY or GIGACHAT_AUTH_KEY")
        }
        "bus" => Some("the Redis password can also be set with CHATLENS_BUS_REDIS_PASSWORD"),
        _ => None,
    }
}

/// Convert a `figment::Error` into one `ConfigError` per reported problem.
///
/// `toml_sources` pairs each file path, as figment reports it, with its
/// content. Configuration given as a string is looked up under
/// [`INLINE_SOURCE`].
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            let source = source_for(&error, toml_sources);
            match &error.kind {
                Kind::UnknownField(field, expected) if path.is_empty() => {
                    let section_names: Vec<&str> = SECTIONS.iter().map(|(n, _)| *n).collect();
                    let suggestion = closest_match(field, section_names.iter().copied())
                        .or_else(|| closest_match(field, expected.iter().copied()))
                        .map(str::to_string);
                    let (span, src) = locate(source, field, |content| {
                        find_section_offset(content, field)
                            .or_else(|| find_key_offset(content, &[], field))
                    });
                    ConfigError::UnknownSection {
                        section: field.clone(),
                        suggestion,
                        span,
                        src,
                    }
                }
                Kind::UnknownField(field, expected) => {
                    let section = path.join(".");
                    let keys: Vec<&str> = match section_keys(&section) {
                        Some(keys) => keys.to_vec(),
                        None => expected.to_vec(),
                    };
                    let suggestion = closest_match(field, keys.iter().copied()).map(str::to_string);
                    let (span, src) =
                        locate(source, field, |content| find_key_offset(content, &path, field));
                    ConfigError::UnknownKey {
                        section,
                        key: field.clone(),
                        suggestion,
                        valid_keys: keys.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: qualified(&path, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((leaf, parent)) => locate(source, leaf, |content| {
                            find_key_offset(content, parent, leaf)
                        }),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: actual.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn qualified(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

/// The TOML text an error was read from.
fn source_for<'a>(
    error: &figment::error::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let name = file.as_deref().unwrap_or(INLINE_SOURCE);
    toml_sources
        .iter()
        .find(|(path, _)| path == name)
        .map(|(path, content)| (path.as_str(), content.as_str()))
}

fn locate(
    source: Option<(&str, &str)>,
    token: &str,
    find: impl FnOnce(&str) -> Option<usize>,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((name, content)) = source else {
        return (None, None);
    };
    match find(content) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), token.len())),
            Some(NamedSource::new(name, content.to_string())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside the table named by `section`.
///
/// Tracks `[header]` lines, so a key of the same name in another section
/// is never matched. An empty `section` means the root table.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(name) = header_name(trimmed) {
            current = name.to_string();
        } else if current == wanted && assigns(trimmed, key) {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

/// Byte offset of the name inside a `[section]` header.
pub fn find_section_offset(content: &str, section: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if header_name(trimmed) == Some(section) {
            let name_at = trimmed.find(section).unwrap_or(1);
            return Some(offset + line.len() - trimmed.len() + name_at);
        }
        offset += line.len();
    }
    None
}

fn header_name(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

fn assigns(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut report = String::new();
        match handler.render_report(&mut report, error) {
            Ok(()) => eprint!("{report}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
    if errors.len() > 1 {
        eprintln!("{} problems found in the configuration", errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatlensConfig;

    #[test]
    fn section_table_covers_every_serialized_key() {
        let value = toml::Value::try_from(ChatlensConfig::default()).unwrap();
        let root = value.as_table().unwrap();
        for (section, keys) in SECTIONS {
            assert!(root.contains_key(*section), "missing section {section}");
            let table = root[*section].as_table().unwrap();
            for key in table.keys() {
                assert!(keys.contains(&key.as_str()), "[{section}] lacks {key}");
            }
        }
        assert_eq!(root.len(), SECTIONS.len());
    }

    #[test]
    fn closest_match_picks_the_nearest_key() {
        let gigachat = section_keys("gigachat").unwrap();
        assert_eq!(closest_match("modle", gigachat.iter().copied()), Some("model"));
        let analysis = section_keys("analysis").unwrap();
        assert_eq!(
            closest_match("batch_sise", analysis.iter().copied()),
            Some("batch_size")
        );
        let bus = section_keys("bus").unwrap();
        assert_eq!(closest_match("zzzzzz", bus.iter().copied()), None);
    }

    #[test]
    fn keys_are_traced_to_their_section() {
        assert_eq!(owning_section("redis_url"), Some("bus"));
        assert_eq!(owning_section("poll_interval_secs"), Some("worker"));
        assert_eq!(owning_section("bot_token"), None);
    }

    #[test]
    fn misplaced_key_help_names_the_owner() {
        let help = key_help("analysis", "model", None, "window_size");
        assert!(help.starts_with("`model` belongs in [gigachat]"), "got: {help}");

        let help = section_help("channel", None);
        assert!(help.contains("key of [bus]"), "got: {help}");
    }

    #[test]
    fn secret_sections_mention_env_overrides() {
        let help = key_help("gigachat", "authkey", Some("auth_key"), "auth_key");
        assert!(help.contains("CHATLENS_GIGACHAT_AUTH_KEY"), "got: {help}");
        let help = key_help("worker", "pol", None, "poll_interval_secs");
        assert!(!help.contains("CHATLENS_"), "got: {help}");
    }

    #[test]
    fn key_offset_respects_section_boundaries() {
        let content = "[bus]\nbuffer = 10\n\n[analysis]\nbuffer = 3\nchanel = \"x\"\n";
        let analysis = vec!["analysis".to_string()];
        let offset = find_key_offset(content, &analysis, "buffer").unwrap();
        assert!(offset > content.find("[analysis]").unwrap());
        assert_eq!(&content[offset..offset + 6], "buffer");

        let bus = vec!["bus".to_string()];
        assert!(find_key_offset(content, &bus, "chanel").is_none());
        assert!(find_key_offset(content, &["worker".to_string()], "buffer").is_none());
    }

    #[test]
    fn key_offset_handles_crlf_and_indentation() {
        let content = "[gigachat]\r\n  modle = \"GigaChat\"\r\n";
        let path = vec!["gigachat".to_string()];
        let offset = find_key_offset(content, &path, "modle").unwrap();
        assert_eq!(&content[offset..offset + 5], "modle");
    }

    #[test]
    fn section_offset_points_at_the_name() {
        let content = "[bus]\nchannel = \"x\"\n[ telegram ]\nbot_token = \"a\"\n";
        let offset = find_section_offset(content, "telegram").unwrap();
        assert_eq!(&content[offset..offset + 8], "telegram");
        assert!(find_section_offset(content, "worker").is_none());
    }
}
