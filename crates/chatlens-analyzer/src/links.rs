// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checks that generated message links point at analyzed messages.

use std::collections::HashSet;

use chatlens_core::{ChatlensError, Discussion};

/// Validates `<host>/<username>/<id>` message links.
#[derive(Debug, Clone)]
pub struct LinkValidator {
    host: String,
}

impl LinkValidator {
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical link prefix for `username`, including the trailing slash.
    pub fn prefix(&self, username: &str) -> String {
        format!("{}/{}/", self.host, username)
    }

    /// Builds the canonical link of one message.
    pub fn link(&self, username: &str, message_id: i64) -> String {
        format!("{}{message_id}", self.prefix(username))
    }

    /// Returns one human-readable violation per bad link; empty means valid.
    pub fn validate(
        &self,
        discussions: &[Discussion],
        expected_username: &str,
        valid_ids: &HashSet<i64>,
    ) -> Vec<String> {
        let prefix = self.prefix(expected_username);
        let mut violations = Vec::new();

        for d in discussions {
            for link in &d.message_links {
                let Some(tail) = link.strip_prefix(&prefix) else {
                    violations.push(format!(
                        "{}: Wrong username in link: {link} (expected: {prefix})",
                        d.topic
                    ));
                    continue;
                };
                match tail.trim_end_matches('/').parse::<i64>() {
                    Ok(id) if valid_ids.contains(&id) => {}
                    Ok(id) => violations.push(format!(
                        "{}: Message {id} not in analyzed messages",
                        d.topic
                    )),
                    Err(_) => violations.push(format!(
                        "{}: Invalid link format: {link}",
                        d.topic
                    )),
                }
            }
        }
        violations
    }

    /// Like [`validate`](Self::validate), folding violations into
    /// [`ChatlensError::Validation`].
    pub fn check(
        &self,
        discussions: &[Discussion],
        expected_username: &str,
        valid_ids: &HashSet<i64>,
    ) -> Result<(), ChatlensError> {
        let violations = self.validate(discussions, expected_username, valid_ids);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ChatlensError::Validation { violations })
        }
    }
}
