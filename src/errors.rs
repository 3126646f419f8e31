// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for event definition, pattern and publish operations

use thiserror::Error;

/// Errors that can occur while building or publishing EventBridge events
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Schema parsing or a refinement rejected the event properties
    #[error("Validation failed for event {event}: {reason}")]
    Validation { event: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pattern compilation was given no events
    #[error("Cannot compute a pattern from an empty event list")]
    EmptyEventList,

    /// Publish was called with no entries
    #[error("Cannot publish an empty batch of entries")]
    EmptyBatch,

    /// Entries created for one bus were handed to another
    #[error("Entry belongs to bus {found} but was published on bus {expected}")]
    BusMismatch { expected: String, found: String },

    /// A single entry is larger than the per-request byte limit
    #[error("Entry of {size} bytes exceeds the batch limit of {limit} bytes")]
    EntryTooLarge { size: usize, limit: usize },

    /// A filter referenced a field the schema does not declare
    #[error("Unknown field '{field}' in filter for event {event}")]
    UnknownField { event: String, field: String },

    /// A filter condition EventBridge would reject
    #[error("Invalid filter on field '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    /// A property name clashes with a reserved input-transformer key
    #[error("Input path key collision: {0}")]
    TemplateKeyCollision(String),

    /// The event bus client reported a transport failure
    #[error("Event bus client error: {0}")]
    Client(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

impl BridgeError {
    /// Build a validation error for the named event
    pub fn validation(event: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Validation {
            event: event.into(),
            reason: reason.into(),
        }
    }
}
