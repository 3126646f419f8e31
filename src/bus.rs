// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event bus abstraction and batched publishing
//!
//! A [`Bus`] pairs a bus name with an [`EventBusClient`], the seam behind
//! which the actual PutEvents call lives. Publishing:
//!
//! 1. rejects empty input and entries tagged for another bus (no call made);
//! 2. fills in `EventBusName` on untagged entries;
//! 3. chunks entries to the configured [`BatchLimits`];
//! 4. sends every chunk concurrently and merges the responses.
//!
//! Failed entries are never retried; they are reported through
//! `failed_entry_count` and the per-entry error codes.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::batch::{chunk_entries, merge_responses};
use crate::config::{BatchLimits, BridgeConfig};
use crate::envelope::{BusId, PublishEntry, PutEventsRequest, PutEventsRequestEntry, PutEventsResponse};
use crate::errors::{BridgeError, BridgeResult};

/// Name EventBridge gives the account's default bus
pub const DEFAULT_BUS_NAME: &str = "default";

/// Client performing a single PutEvents request
///
/// Implementations wrap the AWS SDK or any HTTP transport. A transport
/// failure should be reported as [`BridgeError::Client`]; rejected entries
/// are reported inside the response instead.
#[async_trait]
pub trait EventBusClient: Send + Sync {
    async fn put_events(&self, request: PutEventsRequest) -> BridgeResult<PutEventsResponse>;
}

/// A named event bus with a client and batching limits
pub struct Bus {
    id: BusId,
    name: String,
    client: Arc<dyn EventBusClient>,
    limits: BatchLimits,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Bus {
    /// Create a bus with the default PutEvents limits
    pub fn new(name: impl Into<String>, client: Arc<dyn EventBusClient>) -> Self {
        Self {
            id: BusId::new(),
            name: name.into(),
            client,
            limits: BatchLimits::default(),
        }
    }

    /// Create the account's default bus
    pub fn default_bus(client: Arc<dyn EventBusClient>) -> Self {
        Self::new(DEFAULT_BUS_NAME, client)
    }

    /// Create a bus from configuration
    pub fn from_config(config: &BridgeConfig, client: Arc<dyn EventBusClient>) -> BridgeResult<Self> {
        let name = config
            .event_bus_name
            .clone()
            .unwrap_or_else(|| DEFAULT_BUS_NAME.to_string());
        Ok(Self::new(name, client).with_limits(config.limits()?))
    }

    /// Override the batching limits
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Tag an entry as belonging to this bus
    pub fn tag(&self, mut entry: PutEventsRequestEntry) -> PublishEntry {
        if entry.event_bus_name.is_none() {
            entry.event_bus_name = Some(self.name.clone());
        }
        PublishEntry::tagged(entry, self.id, self.name.clone())
    }

    /// Publish entries, chunking them into concurrent PutEvents calls
    pub async fn put(&self, entries: Vec<PublishEntry>) -> BridgeResult<PutEventsResponse> {
        if entries.is_empty() {
            return Err(BridgeError::EmptyBatch);
        }
        self.check_ownership(&entries)?;

        let total = entries.len();
        let entries: Vec<PublishEntry> = entries
            .into_iter()
            .map(|mut entry| {
                if entry.entry.event_bus_name.is_none() {
                    entry.entry.event_bus_name = Some(self.name.clone());
                }
                entry
            })
            .collect();

        let chunks = chunk_entries(entries, self.limits)?;
        let chunk_count = chunks.len();

        let calls = chunks.into_iter().enumerate().map(|(index, chunk)| {
            let bytes: usize = chunk.iter().map(PublishEntry::size).sum();
            let request = PutEventsRequest {
                entries: chunk.into_iter().map(PublishEntry::into_entry).collect(),
            };
            let client = Arc::clone(&self.client);
            let bus = self.name.as_str();

            async move {
                debug!(
                    bus = %bus,
                    chunk = index,
                    entries = request.entries.len(),
                    bytes = bytes,
                    "Dispatching PutEvents chunk"
                );
                client.put_events(request).await
            }
        });

        let responses = try_join_all(calls).await?;
        let merged = merge_responses(responses);

        if merged.failed_entry_count > 0 {
            warn!(
                bus = %self.name,
                failed = merged.failed_entry_count,
                entries = total,
                "PutEvents reported failed entries"
            );
        }

        info!(
            bus = %self.name,
            entries = total,
            chunks = chunk_count,
            failed = merged.failed_entry_count,
            "Published events"
        );

        Ok(merged)
    }

    fn check_ownership(&self, entries: &[PublishEntry]) -> BridgeResult<()> {
        for entry in entries {
            if let Some(id) = entry.bus_id() {
                if id != self.id {
                    return Err(BridgeError::BusMismatch {
                        expected: format!("{} ({})", self.name, self.id),
                        found: format!("{} ({})", entry.bus_name().unwrap_or_default(), id),
                    });
                }
            }
        }
        Ok(())
    }
}

type BusFactory = Box<dyn Fn() -> Arc<Bus> + Send + Sync>;

enum BusSlot {
    Ready(Arc<Bus>),
    Lazy {
        cell: OnceLock<Arc<Bus>>,
        factory: BusFactory,
    },
}

/// Reference to a bus, either resolved or built on first use
///
/// Clones share the slot, so a lazy factory runs at most once across all
/// clones.
#[derive(Clone)]
pub struct BusRef {
    slot: Arc<BusSlot>,
}

impl BusRef {
    /// Reference an existing bus
    pub fn resolved(bus: Arc<Bus>) -> Self {
        Self {
            slot: Arc::new(BusSlot::Ready(bus)),
        }
    }

    /// Reference a bus built by `factory` the first time it is needed
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<Bus> + Send + Sync + 'static,
    {
        Self {
            slot: Arc::new(BusSlot::Lazy {
                cell: OnceLock::new(),
                factory: Box::new(factory),
            }),
        }
    }

    /// Get the bus, running the factory if it has not run yet
    pub fn resolve(&self) -> Arc<Bus> {
        match self.slot.as_ref() {
            BusSlot::Ready(bus) => Arc::clone(bus),
            BusSlot::Lazy { cell, factory } => Arc::clone(cell.get_or_init(|| {
                let bus = factory();
                debug!(bus = %bus.name(), "Resolved lazy event bus");
                bus
            })),
        }
    }

    /// Whether the bus has been built
    pub fn is_resolved(&self) -> bool {
        match self.slot.as_ref() {
            BusSlot::Ready(_) => true,
            BusSlot::Lazy { cell, .. } => cell.get().is_some(),
        }
    }
}

impl From<Arc<Bus>> for BusRef {
    fn from(bus: Arc<Bus>) -> Self {
        Self::resolved(bus)
    }
}

impl fmt::Debug for BusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusRef")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
