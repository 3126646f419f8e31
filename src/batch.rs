// Copyright (c) 2025 - Cowboy AI, Inc.
//! Chunking and merging for batched PutEvents calls
//!
//! Entries are partitioned greedily in input order: a chunk is closed as soon
//! as the next entry would push it past either the entry-count or the byte
//! limit. Responses from the chunks are merged back into a single response.
//!
//! Merging does not correlate failures to input entries. The merged response
//! carries the summed `FailedEntryCount` and the result entries of every
//! chunk, concatenated in chunk order.

use crate::config::BatchLimits;
use crate::envelope::{PublishEntry, PutEventsResponse};
use crate::errors::{BridgeError, BridgeResult};

/// Split entries into chunks that each fit in one PutEvents request
pub fn chunk_entries(
    entries: Vec<PublishEntry>,
    limits: BatchLimits,
) -> BridgeResult<Vec<Vec<PublishEntry>>> {
    let mut chunks = Vec::new();
    let mut current: Vec<PublishEntry> = Vec::new();
    let mut current_bytes = 0usize;

    for entry in entries {
        let size = entry.size();
        if size > limits.max_bytes() {
            return Err(BridgeError::EntryTooLarge {
                size,
                limit: limits.max_bytes(),
            });
        }

        let full = current.len() == limits.max_entries();
        let overflows = current_bytes + size > limits.max_bytes();
        if !current.is_empty() && (full || overflows) {
            chunks.push(std::mem::take(&mut current));
            current_bytes = 0;
        }

        current_bytes += size;
        current.push(entry);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

/// Merge per-chunk responses into one
pub fn merge_responses<I>(responses: I) -> PutEventsResponse
where
    I: IntoIterator<Item = PutEventsResponse>,
{
    responses
        .into_iter()
        .fold(PutEventsResponse::default(), |mut merged, response| {
            merged.failed_entry_count += response.failed_entry_count;
            merged.entries.extend(response.entries);
            merged
        })
}
