// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Entry Chunking
//!
//! Chunking must never break a request limit, never drop, duplicate or
//! reorder entries, and must only start a new chunk when the next entry
//! would not fit.

use eventbridge_typed::batch::{chunk_entries, merge_responses};
use eventbridge_typed::{BatchLimits, PublishEntry, PutEventsRequestEntry, PutEventsResponse, PutEventsResultEntry};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn entry(detail_len: usize, index: usize) -> PublishEntry {
    PublishEntry::new(PutEventsRequestEntry {
        source: "prop".to_string(),
        detail_type: format!("T{index}"),
        detail: "x".repeat(detail_len),
        event_bus_name: None,
        resources: Vec::new(),
        time: None,
        trace_header: None,
    })
}

/// Entries of varying size, each small enough for a 4 KiB limit
fn entries() -> impl Strategy<Value = Vec<PublishEntry>> {
    prop::collection::vec(0usize..2000, 0..60).prop_map(|lens| {
        lens.into_iter()
            .enumerate()
            .map(|(i, len)| entry(len, i))
            .collect()
    })
}

fn limits() -> impl Strategy<Value = BatchLimits> {
    (1usize..=10, 4096usize..=16_384)
        .prop_map(|(count, bytes)| BatchLimits::new(count, bytes).expect("limits in range"))
}

fn response() -> impl Strategy<Value = PutEventsResponse> {
    (0u32..5, 0usize..10).prop_map(|(failed, ok)| PutEventsResponse {
        failed_entry_count: failed,
        entries: (0..ok)
            .map(|i| PutEventsResultEntry {
                event_id: Some(format!("e{i}")),
                ..Default::default()
            })
            .collect(),
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: every chunk respects both limits and is non-empty
    #[test]
    fn prop_chunks_respect_limits(input in entries(), limits in limits()) {
        let chunks = chunk_entries(input, limits).unwrap();

        for chunk in &chunks {
            prop_assert!(!chunk.is_empty());
            prop_assert!(chunk.len() <= limits.max_entries());
            let bytes: usize = chunk.iter().map(PublishEntry::size).sum();
            prop_assert!(bytes <= limits.max_bytes());
        }
    }

    /// Property: concatenating the chunks yields the input, in order
    #[test]
    fn prop_chunks_preserve_order(input in entries(), limits in limits()) {
        let expected: Vec<String> = input.iter().map(|e| e.entry.detail_type.clone()).collect();

        let chunks = chunk_entries(input, limits).unwrap();
        let flattened: Vec<String> = chunks
            .into_iter()
            .flatten()
            .map(|e| e.entry.detail_type)
            .collect();

        prop_assert_eq!(flattened, expected);
    }

    /// Property: chunks are greedy; the next chunk's first entry did not fit
    #[test]
    fn prop_chunks_are_greedy(input in entries(), limits in limits()) {
        let chunks = chunk_entries(input, limits).unwrap();

        for pair in chunks.windows(2) {
            let bytes: usize = pair[0].iter().map(PublishEntry::size).sum();
            let next = pair[1][0].size();
            prop_assert!(
                pair[0].len() == limits.max_entries() || bytes + next > limits.max_bytes(),
                "chunk closed while the next entry still fit"
            );
        }
    }

    /// Property: merging sums failures and keeps every result entry
    #[test]
    fn prop_merge_totals(responses in prop::collection::vec(response(), 0..8)) {
        let failed: u32 = responses.iter().map(|r| r.failed_entry_count).sum();
        let count: usize = responses.iter().map(|r| r.entries.len()).sum();

        let merged = merge_responses(responses);

        prop_assert_eq!(merged.failed_entry_count, failed);
        prop_assert_eq!(merged.entries.len(), count);
    }
}
