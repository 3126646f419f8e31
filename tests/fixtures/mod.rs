// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for eventbridge-typed
//!
//! Deterministic schemas, inbound envelopes and an in-memory event bus
//! client that records every PutEvents request it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use eventbridge_typed::{
    BridgeError, BridgeResult, Bus, Event, EventBusClient, PutEventsRequest, PutEventsResponse,
    PutEventsResultEntry,
};

pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";
pub const EVENT_ID_1: &str = "01934f4a-0001-7000-8000-000000000001";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: String,
    pub customer_id: String,
    pub total: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderShipped {
    pub order_id: String,
    pub carrier: String,
}

/// Refund schema still accepting the field names of an older producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRefunded {
    #[serde(alias = "orderId")]
    pub order_id: String,
    #[serde(alias = "refundAmount")]
    pub amount: f64,
}

pub fn order_fixture(n: usize) -> OrderPlaced {
    OrderPlaced {
        order_id: format!("o-{n}"),
        customer_id: "c-1".to_string(),
        total: 10.0 + n as f64,
        currency: "EUR".to_string(),
    }
}

/// In-memory PutEvents client
#[derive(Default)]
pub struct RecordingClient {
    requests: Mutex<Vec<PutEventsRequest>>,
    failed_per_call: u32,
    transport_error: bool,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client rejecting the first `count` entries of every request
    pub fn failing(count: u32) -> Arc<Self> {
        Arc::new(Self {
            failed_per_call: count,
            ..Default::default()
        })
    }

    /// Client whose every call fails at the transport level
    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            transport_error: true,
            ..Default::default()
        })
    }

    pub fn requests(&self) -> Vec<PutEventsRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl EventBusClient for RecordingClient {
    async fn put_events(&self, request: PutEventsRequest) -> BridgeResult<PutEventsResponse> {
        if self.transport_error {
            return Err(BridgeError::Client("connection reset".to_string()));
        }

        let entries: Vec<PutEventsResultEntry> = request
            .entries
            .iter()
            .enumerate()
            .map(|(i, _)| {
                if (i as u32) < self.failed_per_call {
                    PutEventsResultEntry {
                        error_code: Some("InternalFailure".to_string()),
                        error_message: Some("injected".to_string()),
                        ..Default::default()
                    }
                } else {
                    PutEventsResultEntry {
                        event_id: Some(format!("evt-{i}")),
                        ..Default::default()
                    }
                }
            })
            .collect();
        let failed = entries.iter().filter(|e| e.is_failure()).count() as u32;

        self.requests.lock().unwrap().push(request);

        Ok(PutEventsResponse {
            failed_entry_count: failed,
            entries,
        })
    }
}

pub fn bus_with(name: &str, client: Arc<RecordingClient>) -> Arc<Bus> {
    Arc::new(Bus::new(name, client))
}

pub fn order_placed_event(bus: Arc<Bus>) -> Event<OrderPlaced> {
    Event::builder("OrderPlaced", "shop.orders")
        .bus(bus)
        .refine(|order: &OrderPlaced| {
            if order.total < 0.0 {
                Err("total must not be negative".to_string())
            } else {
                Ok(())
            }
        })
        .build()
        .expect("valid event definition")
}

pub fn order_shipped_event(bus: Arc<Bus>) -> Event<OrderShipped> {
    Event::builder("OrderShipped", "shop.warehouse")
        .bus(bus)
        .build()
        .expect("valid event definition")
}

pub fn order_refunded_event(bus: Arc<Bus>) -> Event<OrderRefunded> {
    Event::builder("OrderRefunded", "shop.payments")
        .bus(bus)
        .build()
        .expect("valid event definition")
}

/// A delivered EventBridge envelope around `properties`
pub fn inbound_json(detail_type: &str, source: &str, properties: Value) -> Value {
    json!({
        "version": "0",
        "id": EVENT_ID_1,
        "detail-type": detail_type,
        "source": source,
        "account": "111122223333",
        "time": FIXED_TIMESTAMP,
        "region": "eu-west-1",
        "resources": [],
        "detail": { "properties": properties }
    })
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
