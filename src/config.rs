// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration for buses and batch publishing
//!
//! PutEvents accepts at most 10 entries and 256 KiB per request. The defaults
//! match those limits; smaller values can be configured for testing or for
//! buses fronted by stricter proxies, larger ones are rejected.

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};

/// Maximum number of entries PutEvents accepts in one request
pub const MAX_BATCH_ENTRIES: usize = 10;

/// Maximum total entry size PutEvents accepts in one request
pub const MAX_BATCH_BYTES: usize = 256 * 1024;

/// Configuration for a bus and its publish batching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Event bus name (or ARN); the default bus when unset
    #[serde(default)]
    pub event_bus_name: Option<String>,

    /// Maximum entries per PutEvents request
    #[serde(default = "default_max_entries")]
    pub max_batch_entries: usize,

    /// Maximum summed entry size per PutEvents request
    #[serde(default = "default_max_bytes")]
    pub max_batch_bytes: usize,
}

fn default_max_entries() -> usize {
    MAX_BATCH_ENTRIES
}

fn default_max_bytes() -> usize {
    MAX_BATCH_BYTES
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            event_bus_name: None,
            max_batch_entries: MAX_BATCH_ENTRIES,
            max_batch_bytes: MAX_BATCH_BYTES,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables
    ///
    /// - `EVENT_BUS_NAME`
    /// - `EVENTBRIDGE_MAX_BATCH_ENTRIES`
    /// - `EVENTBRIDGE_MAX_BATCH_BYTES`
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> BridgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let event_bus_name = lookup("EVENT_BUS_NAME").filter(|name| !name.is_empty());

        let max_batch_entries = match lookup("EVENTBRIDGE_MAX_BATCH_ENTRIES") {
            Some(raw) => parse_limit("EVENTBRIDGE_MAX_BATCH_ENTRIES", &raw)?,
            None => defaults.max_batch_entries,
        };

        let max_batch_bytes = match lookup("EVENTBRIDGE_MAX_BATCH_BYTES") {
            Some(raw) => parse_limit("EVENTBRIDGE_MAX_BATCH_BYTES", &raw)?,
            None => defaults.max_batch_bytes,
        };

        let config = Self {
            event_bus_name,
            max_batch_entries,
            max_batch_bytes,
        };
        config.limits()?;
        Ok(config)
    }

    /// Validated batch limits for this configuration
    pub fn limits(&self) -> BridgeResult<BatchLimits> {
        BatchLimits::new(self.max_batch_entries, self.max_batch_bytes)
    }
}

fn parse_limit(key: &str, raw: &str) -> BridgeResult<usize> {
    raw.trim()
        .parse()
        .map_err(|e| BridgeError::Configuration(format!("{key}={raw}: {e}")))
}

/// Per-request limits used when chunking entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    max_entries: usize,
    max_bytes: usize,
}

impl BatchLimits {
    /// Create limits, rejecting zero values and values above the PutEvents maxima
    pub fn new(max_entries: usize, max_bytes: usize) -> BridgeResult<Self> {
        if max_entries == 0 || max_entries > MAX_BATCH_ENTRIES {
            return Err(BridgeError::Configuration(format!(
                "max batch entries must be between 1 and {MAX_BATCH_ENTRIES}, got {max_entries}"
            )));
        }
        if max_bytes == 0 || max_bytes > MAX_BATCH_BYTES {
            return Err(BridgeError::Configuration(format!(
                "max batch bytes must be between 1 and {MAX_BATCH_BYTES}, got {max_bytes}"
            )));
        }
        Ok(Self {
            max_entries,
            max_bytes,
        })
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_entries: MAX_BATCH_ENTRIES,
            max_bytes: MAX_BATCH_BYTES,
        }
    }
}
