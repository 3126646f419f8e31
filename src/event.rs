// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed event definitions
//!
//! An [`Event`] ties a detail-type name and a source to a schema type and the
//! bus its instances are published on. From one definition you can:
//!
//! - create and publish validated entries ([`Event::create`], [`Event::publish`])
//! - compile rule patterns ([`Event::pattern`])
//! - infer input transformers ([`Event::transform`])
//! - parse delivered events in a target ([`Event::parse`], [`Event::handler`])
//!
//! # Example
//!
//! ```rust,no_run
//! use eventbridge_typed::{Bus, Event, EventBusClient, Filter};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize)]
//! struct OrderPlaced {
//!     order_id: String,
//!     total: f64,
//! }
//!
//! async fn run(client: Arc<dyn EventBusClient>) -> eventbridge_typed::BridgeResult<()> {
//!     let bus = Arc::new(Bus::new("orders", client));
//!     let order_placed = Event::<OrderPlaced>::builder("OrderPlaced", "shop")
//!         .bus(bus)
//!         .build()?;
//!
//!     order_placed
//!         .publish(&[OrderPlaced { order_id: "o-1".into(), total: 12.5 }])
//!         .await?;
//!
//!     let pattern = order_placed.pattern(Some(&Filter::new().equals("order_id", "o-1")))?;
//!     println!("{}", pattern.to_json_string()?);
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::bus::{Bus, BusRef};
use crate::envelope::{DetailEnvelope, InboundEvent, PublishEntry, PutEventsRequestEntry, PutEventsResponse};
use crate::errors::{BridgeError, BridgeResult};
use crate::pattern::{compute_pattern, EventPattern, Filter, PatternTarget};
use crate::schema::{schema_fields, EventSchema, SchemaValidator};
use crate::transform::{infer_transformer, InputTransformer, PropertiesProxy, SystemProxy};

/// Optional envelope fields for a created entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub resources: Vec<String>,
    pub time: Option<DateTime<Utc>>,
    pub trace_header: Option<String>,
}

/// An immutable event definition over schema `T`
pub struct Event<T> {
    name: String,
    source: String,
    bus: BusRef,
    validator: SchemaValidator<T>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            source: self.source.clone(),
            bus: self.bus.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("bus", &self.bus)
            .finish()
    }
}

impl<T: EventSchema> Event<T> {
    /// Start a definition for detail-type `name` emitted by `source`
    pub fn builder(name: impl Into<String>, source: impl Into<String>) -> EventBuilder<T> {
        let name = name.into();
        EventBuilder {
            validator: SchemaValidator::new(name.clone()),
            name,
            source: source.into(),
            bus: None,
        }
    }

    /// Detail-type of this event
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bus(&self) -> &BusRef {
        &self.bus
    }

    /// Known schema fields; empty when `T` is not a plain struct
    pub fn fields(&self) -> Vec<String> {
        schema_fields::<T>()
    }

    /// Validate properties and build a publish entry tagged with this event's bus
    pub fn create(&self, properties: &T) -> BridgeResult<PublishEntry> {
        self.create_with(properties, EntryOptions::default())
    }

    /// Like [`Event::create`], with resources, time or a trace header
    pub fn create_with(&self, properties: &T, options: EntryOptions) -> BridgeResult<PublishEntry> {
        let properties = self.validator.validate(properties)?;
        let detail = serde_json::to_string(&DetailEnvelope { properties })?;

        let entry = PutEventsRequestEntry {
            source: self.source.clone(),
            detail_type: self.name.clone(),
            detail,
            event_bus_name: None,
            resources: options.resources,
            time: options.time,
            trace_header: options.trace_header,
        };

        Ok(self.bus.resolve().tag(entry))
    }

    /// Validate and publish events on this event's bus
    pub async fn publish(&self, events: &[T]) -> BridgeResult<PutEventsResponse> {
        let entries = events
            .iter()
            .map(|properties| self.create(properties))
            .collect::<BridgeResult<Vec<_>>>()?;

        debug!(event = %self.name, count = entries.len(), "Publishing typed events");
        self.bus.resolve().put(entries).await
    }

    /// Compile a rule pattern for this event, optionally filtered
    pub fn pattern(&self, filter: Option<&Filter>) -> BridgeResult<EventPattern> {
        compute_pattern(&[self], filter)
    }

    /// Parse a delivered event, validating its detail against the schema
    pub fn parse(&self, raw: InboundEvent<Value>) -> BridgeResult<InboundEvent<T>> {
        if raw.detail_type != self.name {
            return Err(BridgeError::validation(
                &self.name,
                format!("unexpected detail-type '{}'", raw.detail_type),
            ));
        }

        let properties = match &raw.detail {
            Value::Object(detail) => detail.get("properties").cloned(),
            _ => None,
        }
        .ok_or_else(|| BridgeError::validation(&self.name, "detail has no properties object"))?;

        let properties = self.validator.parse(properties)?;
        Ok(raw.map_detail(properties))
    }

    /// Parse a delivered event from raw JSON
    pub fn parse_json(&self, raw: Value) -> BridgeResult<InboundEvent<T>> {
        let raw: InboundEvent<Value> = serde_json::from_value(raw)
            .map_err(|e| BridgeError::validation(&self.name, e.to_string()))?;
        self.parse(raw)
    }

    /// Wrap a handler so it receives parsed, validated events
    pub fn handler<F, Fut>(&self, handler: F) -> EventHandler<T, F>
    where
        F: Fn(InboundEvent<T>) -> Fut,
        Fut: Future,
    {
        EventHandler {
            event: self.clone(),
            handler,
        }
    }

    /// Infer an input transformer from a transform over placeholder proxies
    pub fn transform<F, R>(&self, transform: F) -> BridgeResult<InputTransformer>
    where
        F: FnOnce(&PropertiesProxy<'_>, &SystemProxy<'_>) -> R,
        R: Serialize,
    {
        infer_transformer(&self.fields(), transform)
    }
}

impl<T: EventSchema> PatternTarget for Event<T> {
    fn source(&self) -> &str {
        &self.source
    }

    fn detail_type(&self) -> &str {
        &self.name
    }

    fn schema_fields(&self) -> Vec<String> {
        self.fields()
    }
}

/// Builder for [`Event`]
pub struct EventBuilder<T> {
    name: String,
    source: String,
    bus: Option<BusRef>,
    validator: SchemaValidator<T>,
}

impl<T: EventSchema> EventBuilder<T> {
    /// Publish on an existing bus
    pub fn bus(mut self, bus: impl Into<BusRef>) -> Self {
        self.bus = Some(bus.into());
        self
    }

    /// Publish on a bus built the first time it is needed
    pub fn lazy_bus<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<Bus> + Send + Sync + 'static,
    {
        self.bus = Some(BusRef::lazy(factory));
        self
    }

    /// Add a refinement checked on every created or parsed event
    pub fn refine<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = self.validator.refine(check);
        self
    }

    pub fn build(self) -> BridgeResult<Event<T>> {
        if self.name.trim().is_empty() {
            return Err(BridgeError::Configuration("event name is empty".to_string()));
        }
        if self.source.trim().is_empty() {
            return Err(BridgeError::Configuration(format!(
                "event {} has an empty source",
                self.name
            )));
        }
        let bus = self.bus.ok_or_else(|| {
            BridgeError::Configuration(format!("event {} has no bus", self.name))
        })?;

        Ok(Event {
            name: self.name,
            source: self.source,
            bus,
            validator: self.validator,
        })
    }
}

/// A target handler receiving typed events
pub struct EventHandler<T, F> {
    event: Event<T>,
    handler: F,
}

impl<T, F, Fut> EventHandler<T, F>
where
    T: EventSchema,
    F: Fn(InboundEvent<T>) -> Fut,
    Fut: Future,
{
    /// Parse the delivered event and run the handler; invalid events never reach it
    pub async fn handle(&self, raw: InboundEvent<Value>) -> BridgeResult<Fut::Output> {
        let event = self.event.parse(raw)?;
        debug!(event = %self.event.name, id = %event.id, "Handling event");
        Ok((self.handler)(event).await)
    }

    /// Same as [`EventHandler::handle`] for raw JSON input
    pub async fn handle_json(&self, raw: Value) -> BridgeResult<Fut::Output> {
        let event = self.event.parse_json(raw)?;
        debug!(event = %self.event.name, id = %event.id, "Handling event");
        Ok((self.handler)(event).await)
    }

    pub fn event(&self) -> &Event<T> {
        &self.event
    }
}
