// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatlens transcript analyzer.
//!
//! This crate provides the error taxonomy, the domain types shared by every
//! stage of the pipeline, and the adapter traits behind which the completion
//! service, the storage layer and the event bus live.

pub mod discussion;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use discussion::{
    AnalysisMetadata, AnalysisResult, Discussion, DiscussionStats, ExpertComment, KeywordCount,
    Priority, Sentiment, StructuredComment, normalize_topic,
};
pub use error::ChatlensError;
pub use types::{
    AnalysisTask, CompletionRequest, CompletionResponse, FetchEvent, Message, ModelInfo,
    Reaction, SourceInfo, SourceKind, TaskStatus, Transcript, normalize_source,
};

pub use traits::{CompletionProvider, EventSource, ResultStore, TranscriptSource};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_traits_are_exported() {
        fn _assert_completion<T: CompletionProvider>() {}
        fn _assert_transcripts<T: TranscriptSource>() {}
        fn _assert_results<T: ResultStore>() {}
        fn _assert_events<T: EventSource>() {}
    }

    #[test]
    fn trait_objects_are_constructible() {
        fn _boxed(_: Box<dyn CompletionProvider>, _: Box<dyn ResultStore>) {}
        fn _dyn_source(_: &dyn TranscriptSource, _: Box<dyn EventSource>) {}
    }
}
