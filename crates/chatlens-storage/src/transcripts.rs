// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily transcripts stored as `<root>/<source>/<day>.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chatlens_core::{ChatlensError, Transcript, TranscriptSource, normalize_source};
use tracing::debug;

/// Reads transcripts written by the fetcher.
#[derive(Debug, Clone)]
pub struct FileTranscriptSource {
    root: PathBuf,
}

impl FileTranscriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the transcript for `source` on `day`, whether or not it exists.
    pub fn transcript_path(&self, source: &str, day: &str) -> PathBuf {
        self.root
            .join(normalize_source(source))
            .join(format!("{day}.json"))
    }

    /// Names of every source directory, sorted.
    pub async fn list_sources(&self) -> Result<Vec<String>, ChatlensError> {
        list_dir_names(&self.root, |path, is_dir| {
            if !is_dir {
                return None;
            }
            path.file_name()?.to_str().map(str::to_string)
        })
        .await
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn load(&self, source: &str, day: &str) -> Result<Transcript, ChatlensError> {
        let path = self.transcript_path(source, day);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ChatlensError::DataNotFound {
                    chat: normalize_source(source).to_string(),
                    day: day.to_string(),
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(ChatlensError::storage(e)),
        };

        let transcript: Transcript = serde_json::from_str(&text).map_err(|e| {
            ChatlensError::DataValidation(format!("{}: {e}", path.display()))
        })?;
        transcript
            .validate()
            .map_err(|e| ChatlensError::DataValidation(format!("{}: {e}", path.display())))?;

        debug!(
            path = %path.display(),
            messages = transcript.messages.len(),
            "transcript loaded"
        );
        Ok(transcript)
    }

    async fn list_days(&self, source: &str) -> Result<Vec<String>, ChatlensError> {
        let dir = self.root.join(normalize_source(source));
        let mut days = list_dir_names(&dir, json_stem).await?;
        days.sort_by(|a, b| b.cmp(a));
        Ok(days)
    }
}

/// Stem of a `*.json` file.
pub(crate) fn json_stem(path: &Path, is_dir: bool) -> Option<String> {
    if is_dir || path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

/// Collects names of directory entries accepted by `select`, sorted.
///
/// A missing directory yields an empty list.
pub(crate) async fn list_dir_names<F>(dir: &Path, select: F) -> Result<Vec<String>, ChatlensError>
where
    F: Fn(&Path, bool) -> Option<String>,
{
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ChatlensError::storage(e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ChatlensError::storage)? {
        let is_dir = entry
            .file_type()
            .await
            .map_err(ChatlensError::storage)?
            .is_dir();
        if let Some(name) = select(&entry.path(), is_dir) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_test_utils::fixtures;
    use tempfile::tempdir;

    fn write(root: &Path, source: &str, day: &str, body: &str) {
        let dir = root.join(source);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{day}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn loads_transcript_with_at_prefixed_source() {
        let dir = tempdir().unwrap();
        let transcript = fixtures::transcript("ru_python", 4);
        write(
            dir.path(),
            "ru_python",
            "2025-03-01",
            &serde_json::to_string(&transcript).unwrap(),
        );

        let source = FileTranscriptSource::new(dir.path());
        let loaded = source.load("@ru_python", "2025-03-01").await.unwrap();
        assert_eq!(loaded, transcript);
    }

    #[tokio::test]
    async fn missing_file_is_data_not_found() {
        let dir = tempdir().unwrap();
        let source = FileTranscriptSource::new(dir.path());
        let err = source.load("ru_python", "2025-03-01").await.unwrap_err();
        match err {
            ChatlensError::DataNotFound { chat, day, path } => {
                assert_eq!(chat, "ru_python");
                assert_eq!(day, "2025-03-01");
                assert!(path.ends_with("2025-03-01.json"));
            }
            other => panic!("expected DataNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_file_is_data_validation() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a", "2025-03-01", r#"{"messages": "nope"}"#);
        let err = FileTranscriptSource::new(dir.path())
            .load("a", "2025-03-01")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "data_validation");
    }

    #[tokio::test]
    async fn lists_days_newest_first_and_sources() {
        let dir = tempdir().unwrap();
        for day in ["2025-03-01", "2025-03-03", "2025-03-02"] {
            write(dir.path(), "a", day, "{}");
        }
        write(dir.path(), "b", "2025-01-01", "{}");
        std::fs::write(dir.path().join("a").join("notes.txt"), "x").unwrap();

        let source = FileTranscriptSource::new(dir.path());
        assert_eq!(
            source.list_days("@a").await.unwrap(),
            vec!["2025-03-03", "2025-03-02", "2025-03-01"]
        );
        assert_eq!(source.list_sources().await.unwrap(), vec!["a", "b"]);
        assert!(source.list_days("missing").await.unwrap().is_empty());
    }
}
