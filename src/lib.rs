// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed helpers for AWS EventBridge
//!
//! This crate turns a schema type into everything needed to work with an
//! EventBridge bus:
//!
//! - validated PutEvents entries and batched, concurrent publishing
//! - rule patterns compiled from typed filters
//! - input transformers inferred from plain transform functions
//! - parsing of delivered events inside rule targets
//!
//! The PutEvents call itself sits behind the [`EventBusClient`] trait, so any
//! AWS SDK or HTTP transport can be plugged in.

pub mod batch;
pub mod bus;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod event;
pub mod pattern;
pub mod schema;
pub mod transform;

// Re-export commonly used types
pub use bus::{Bus, BusRef, EventBusClient};
pub use config::{BatchLimits, BridgeConfig};
pub use envelope::{
    InboundEvent, PublishEntry, PutEventsRequest, PutEventsRequestEntry, PutEventsResponse,
    PutEventsResultEntry,
};
pub use errors::{BridgeError, BridgeResult};
pub use event::{EntryOptions, Event, EventHandler};
pub use pattern::{compute_pattern, AnythingBut, EventPattern, Filter, Matcher, Numeric};
pub use transform::{InputTransformer, Placeholder, SystemField};
