// Copyright (c) 2025 - Cowboy AI, Inc.
//! Wire shapes for PutEvents requests and delivered events
//!
//! Outgoing events travel as `PutEventsRequestEntry` values whose `Detail`
//! is the JSON string of a [`DetailEnvelope`]:
//!
//! ```text
//! { "properties": { ...schema fields... } }
//! ```
//!
//! Targets receive the full EventBridge envelope, modelled by
//! [`InboundEvent`], with the same detail shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Bytes PutEvents charges for an entry's `Time` field
pub const TIME_FIELD_BYTES: usize = 14;

/// One entry of a PutEvents request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsRequestEntry {
    pub source: String,

    pub detail_type: String,

    /// JSON string of the event detail
    pub detail: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bus_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_header: Option<String>,
}

/// A PutEvents request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsRequest {
    pub entries: Vec<PutEventsRequestEntry>,
}

/// Result of one entry in a PutEvents response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsResultEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PutEventsResultEntry {
    /// Whether this entry was rejected
    pub fn is_failure(&self) -> bool {
        self.error_code.is_some()
    }
}

/// A PutEvents response, possibly merged from several requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsResponse {
    #[serde(default)]
    pub failed_entry_count: u32,

    #[serde(default)]
    pub entries: Vec<PutEventsResultEntry>,
}

/// Identity of a bus instance, used to catch entries published on the wrong bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(Uuid);

impl BusId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BusId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request entry tagged with the bus it was created for
///
/// The tag never reaches the wire; it only lets [`crate::Bus::put`] refuse
/// entries built for another bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PublishEntry {
    pub entry: PutEventsRequestEntry,

    #[serde(skip)]
    bus: Option<TaggedBus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TaggedBus {
    id: BusId,
    name: String,
}

impl PublishEntry {
    /// Wrap an entry without a bus tag
    pub fn new(entry: PutEventsRequestEntry) -> Self {
        Self { entry, bus: None }
    }

    /// Tag the entry with its originating bus
    pub fn tagged(entry: PutEventsRequestEntry, bus_id: BusId, bus_name: impl Into<String>) -> Self {
        Self {
            entry,
            bus: Some(TaggedBus {
                id: bus_id,
                name: bus_name.into(),
            }),
        }
    }

    /// Bus this entry was created for, if tagged
    pub fn bus_id(&self) -> Option<BusId> {
        self.bus.as_ref().map(|b| b.id)
    }

    /// Name of the bus this entry was created for, if tagged
    pub fn bus_name(&self) -> Option<&str> {
        self.bus.as_ref().map(|b| b.name.as_str())
    }

    /// Byte cost of this entry against the request size limit
    pub fn size(&self) -> usize {
        entry_size(&self.entry)
    }

    pub fn into_entry(self) -> PutEventsRequestEntry {
        self.entry
    }
}

/// Byte cost of an entry as PutEvents computes it
pub fn entry_size(entry: &PutEventsRequestEntry) -> usize {
    let mut size = entry.source.len() + entry.detail_type.len() + entry.detail.len();

    if let Some(bus) = &entry.event_bus_name {
        size += bus.len();
    }
    if entry.time.is_some() {
        size += TIME_FIELD_BYTES;
    }
    if let Some(trace) = &entry.trace_header {
        size += trace.len();
    }
    size + entry.resources.iter().map(String::len).sum::<usize>()
}

/// The JSON object carried in an entry's `Detail`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailEnvelope<T> {
    pub properties: T,
}

/// An event as EventBridge delivers it to a rule target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent<D> {
    #[serde(default)]
    pub version: String,

    pub id: String,

    #[serde(rename = "detail-type")]
    pub detail_type: String,

    pub source: String,

    #[serde(default)]
    pub account: String,

    pub time: DateTime<Utc>,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub resources: Vec<String>,

    pub detail: D,
}

impl<D> InboundEvent<D> {
    /// Replace the detail, keeping the envelope fields
    pub fn map_detail<E>(self, detail: E) -> InboundEvent<E> {
        InboundEvent {
            version: self.version,
            id: self.id,
            detail_type: self.detail_type,
            source: self.source,
            account: self.account,
            time: self.time,
            region: self.region,
            resources: self.resources,
            detail,
        }
    }
}
