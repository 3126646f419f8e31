// Copyright (c) 2025 - Cowboy AI, Inc.
//! Schema validation and field introspection
//!
//! An event schema is any type serde can round-trip. Validation parses the
//! JSON properties into the schema type and then applies refinements, the
//! checks the type system cannot express (ranges, formats, cross-field rules).
//!
//! Field enumeration is best-effort: a probe deserializer records the field
//! list serde passes to `deserialize_struct` and aborts. That list also holds
//! alias names, so each name is then fed back twice and the struct's own
//! duplicate-field error names the field it belongs to. Schemas that are not
//! plain structs (maps, enums, flattened structs) yield no fields.
//!
//! ```rust
//! use eventbridge_typed::schema::schema_fields;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct OrderPlaced {
//!     order_id: String,
//!     total: f64,
//! }
//!
//! assert_eq!(schema_fields::<OrderPlaced>(), vec!["order_id", "total"]);
//! ```

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::errors::{BridgeError, BridgeResult};

/// Bound satisfied by every type usable as event properties
pub trait EventSchema: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> EventSchema for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Enumerate the top-level field names of a schema type
///
/// Names are the ones found on the wire. Aliases accepted by
/// `#[serde(alias)]` resolve to their field's own name. Fields marked
/// `skip_deserializing` are not listed.
pub fn schema_fields<T: DeserializeOwned>() -> Vec<String> {
    let names = match T::deserialize(FieldProbe::Names) {
        Err(ProbeAbort::Fields(names)) => names,
        _ => return Vec::new(),
    };

    let mut fields: Vec<String> = Vec::new();
    for &name in names {
        let field = canonical_name::<T>(name).unwrap_or(name);
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    fields
}

/// Feed `name` twice; the struct reports the duplicate under its own name.
/// `None` when the first value cannot be faked.
fn canonical_name<T: DeserializeOwned>(name: &'static str) -> Option<&'static str> {
    match T::deserialize(FieldProbe::Repeat(name)) {
        Err(ProbeAbort::Duplicate(field)) => Some(field),
        _ => None,
    }
}

enum FieldProbe {
    Names,
    Repeat(&'static str),
}

#[derive(Debug)]
enum ProbeAbort {
    Fields(&'static [&'static str]),
    Duplicate(&'static str),
    Stop,
}

impl fmt::Display for ProbeAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field probe aborted")
    }
}

impl std::error::Error for ProbeAbort {}

impl de::Error for ProbeAbort {
    fn custom<M: fmt::Display>(_msg: M) -> Self {
        ProbeAbort::Stop
    }

    fn duplicate_field(field: &'static str) -> Self {
        ProbeAbort::Duplicate(field)
    }
}

impl<'de> Deserializer<'de> for FieldProbe {
    type Error = ProbeAbort;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeAbort::Stop)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self {
            FieldProbe::Names => Err(ProbeAbort::Fields(fields)),
            FieldProbe::Repeat(name) => visitor.visit_map(RepeatedKey { name, remaining: 2 }),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

/// Map yielding the same key twice, each with a blank value
struct RepeatedKey {
    name: &'static str,
    remaining: u8,
}

impl<'de> MapAccess<'de> for RepeatedKey {
    type Error = ProbeAbort;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(BorrowedStrDeserializer::new(self.name))
            .map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        seed.deserialize(Blank)
    }
}

/// Produces the empty value of whatever type asks: zero, `""`, `None`,
/// empty sequences and maps. Enums are not faked.
struct Blank;

impl<'de> Deserializer<'de> for Blank {
    type Error = ProbeAbort;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bool(false)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_f64(0.0)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_f64(0.0)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_char('0')
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_str("")
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_str("")
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bytes(&[])
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bytes(&[])
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_none()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(Empty)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(Empty)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(Empty)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_map(Empty)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_map(Empty)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(ProbeAbort::Stop)
    }

    serde::forward_to_deserialize_any! {
        i128 u128 unit unit_struct identifier ignored_any
    }
}

struct Empty;

impl<'de> SeqAccess<'de> for Empty {
    type Error = ProbeAbort;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        _seed: S,
    ) -> Result<Option<S::Value>, Self::Error> {
        Ok(None)
    }
}

impl<'de> MapAccess<'de> for Empty {
    type Error = ProbeAbort;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        _seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, _seed: V) -> Result<V::Value, Self::Error> {
        Err(ProbeAbort::Stop)
    }
}

type Refinement<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// Parses and refines event properties for one event definition
pub struct SchemaValidator<T> {
    event: String,
    refinements: Vec<Refinement<T>>,
}

impl<T> Clone for SchemaValidator<T> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
            refinements: self.refinements.clone(),
        }
    }
}

impl<T> fmt::Debug for SchemaValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("event", &self.event)
            .field("refinements", &self.refinements.len())
            .finish()
    }
}

impl<T: EventSchema> SchemaValidator<T> {
    /// Create a validator reporting errors against the named event
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            refinements: Vec::new(),
        }
    }

    /// Add a refinement run after the structural parse succeeds
    pub fn refine<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.refinements.push(Arc::new(check));
        self
    }

    /// Parse raw JSON into the schema type, failing fast on the first error
    pub fn parse(&self, value: serde_json::Value) -> BridgeResult<T> {
        let parsed: T = serde_json::from_value(value)
            .map_err(|e| BridgeError::validation(&self.event, e.to_string()))?;
        self.check(&parsed)?;
        Ok(parsed)
    }

    /// Validate an already typed value and return its JSON form
    ///
    /// The value is round-tripped through the schema so custom
    /// deserialization rules apply to outgoing events too.
    pub fn validate(&self, properties: &T) -> BridgeResult<serde_json::Value> {
        let value = serde_json::to_value(properties)?;
        let reparsed: T = serde_json::from_value(value.clone())
            .map_err(|e| BridgeError::validation(&self.event, e.to_string()))?;
        self.check(&reparsed)?;
        Ok(value)
    }

    fn check(&self, properties: &T) -> BridgeResult<()> {
        for refinement in &self.refinements {
            refinement(properties).map_err(|reason| BridgeError::validation(&self.event, reason))?;
        }
        Ok(())
    }
}
