// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting a transcript into bounded, contiguous batches.

use std::num::NonZeroUsize;

use chatlens_core::Message;

/// An ordered, contiguous slice of a transcript.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptBatch<'a> {
    /// Zero-based position of the batch.
    pub index: usize,
    /// Position of the first message of the batch in the transcript.
    pub offset: usize,
    pub messages: &'a [Message],
}

impl TranscriptBatch<'_> {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Partitions `messages` into `ceil(n / batch_size)` batches in source order.
///
/// Every batch holds `batch_size` messages except possibly the last one.
pub fn chunk(messages: &[Message], batch_size: NonZeroUsize) -> Vec<TranscriptBatch<'_>> {
    messages
        .chunks(batch_size.get())
        .enumerate()
        .map(|(index, slice)| TranscriptBatch {
            index,
            offset: index * batch_size.get(),
            messages: slice,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_test_utils::fixtures;
    use proptest::prelude::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn uneven_tail_batch() {
        let t = fixtures::transcript("rust", 250);
        let batches = chunk(&t.messages, size(100));
        let lens: Vec<usize> = batches.iter().map(TranscriptBatch::len).collect();
        assert_eq!(lens, vec![100, 100, 50]);
        assert_eq!(batches[2].offset, 200);
        assert_eq!(batches[2].messages[0].id, t.messages[200].id);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(chunk(&[], size(10)).is_empty());
    }

    proptest! {
        #[test]
        fn batches_partition_the_transcript(n in 0usize..400, batch in 1usize..120) {
            let t = fixtures::transcript("rust", n);
            let batches = chunk(&t.messages, size(batch));

            prop_assert_eq!(batches.len(), n.div_ceil(batch));
            let rejoined: Vec<i64> = batches
                .iter()
                .flat_map(|b| b.messages.iter().map(|m| m.id))
                .collect();
            let original: Vec<i64> = t.messages.iter().map(|m| m.id).collect();
            prop_assert_eq!(rejoined, original);
            for (i, b) in batches.iter().enumerate() {
                prop_assert_eq!(b.index, i);
                prop_assert!(!b.is_empty() && b.len() <= batch);
            }
        }
    }
}
