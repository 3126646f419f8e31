// Copyright (c) 2025 - Cowboy AI, Inc.
//! EventBridge filter pattern compiler
//!
//! Compiles event definitions and an optional [`Filter`] into the JSON
//! pattern syntax EventBridge rules accept:
//!
//! ```text
//! {
//!   "source": ["shop"],
//!   "detail-type": ["OrderPlaced"],
//!   "detail": { "properties": { <filter> } }
//! }
//! ```
//!
//! `source` and `detail-type` are always arrays. `detail` only appears when
//! a filter is given, and mirrors the filter verbatim under `properties`.
//!
//! # Example
//!
//! ```rust
//! use eventbridge_typed::pattern::{Filter, Matcher, Numeric};
//! use serde_json::json;
//!
//! let filter = Filter::new()
//!     .field("status", [Matcher::exact("paid")])
//!     .field("total", [Matcher::numeric(Numeric::new().gt(100).le(500))]);
//!
//! assert_eq!(
//!     filter.to_json(),
//!     json!({
//!         "status": ["paid"],
//!         "total": [{"numeric": [">", 100, "<=", 500]}]
//!     })
//! );
//! ```

use serde::ser::Serializer;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::errors::{BridgeError, BridgeResult};

/// Key EventBridge uses for compound OR conditions
pub const OR_KEY: &str = "$or";

/// A single match descriptor for one field
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Exact value match (string, number, boolean or null)
    Exact(Value),
    Prefix(String),
    PrefixIgnoreCase(String),
    Suffix(String),
    SuffixIgnoreCase(String),
    Wildcard(String),
    EqualsIgnoreCase(String),
    Numeric(Numeric),
    AnythingBut(AnythingBut),
    Exists(bool),
    /// IP address range in CIDR notation
    Cidr(String),
}

impl Matcher {
    pub fn exact(value: impl Into<Value>) -> Self {
        Matcher::Exact(value.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Matcher::Prefix(prefix.into())
    }

    pub fn prefix_ignore_case(prefix: impl Into<String>) -> Self {
        Matcher::PrefixIgnoreCase(prefix.into())
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Matcher::Suffix(suffix.into())
    }

    pub fn suffix_ignore_case(suffix: impl Into<String>) -> Self {
        Matcher::SuffixIgnoreCase(suffix.into())
    }

    pub fn wildcard(pattern: impl Into<String>) -> Self {
        Matcher::Wildcard(pattern.into())
    }

    pub fn equals_ignore_case(value: impl Into<String>) -> Self {
        Matcher::EqualsIgnoreCase(value.into())
    }

    pub fn numeric(range: Numeric) -> Self {
        Matcher::Numeric(range)
    }

    /// Match anything except the given values
    ///
    /// EventBridge rejects an empty list; [`compute_pattern`] reports it as
    /// [`BridgeError::InvalidFilter`].
    pub fn anything_but<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Matcher::AnythingBut(AnythingBut::Values(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn exists(exists: bool) -> Self {
        Matcher::Exists(exists)
    }

    pub fn cidr(range: impl Into<String>) -> Self {
        Matcher::Cidr(range.into())
    }

    /// EventBridge JSON for this matcher
    pub fn to_json(&self) -> Value {
        match self {
            Matcher::Exact(value) => value.clone(),
            Matcher::Prefix(p) => json!({ "prefix": p }),
            Matcher::PrefixIgnoreCase(p) => json!({ "prefix": { "equals-ignore-case": p } }),
            Matcher::Suffix(s) => json!({ "suffix": s }),
            Matcher::SuffixIgnoreCase(s) => json!({ "suffix": { "equals-ignore-case": s } }),
            Matcher::Wildcard(w) => json!({ "wildcard": w }),
            Matcher::EqualsIgnoreCase(v) => json!({ "equals-ignore-case": v }),
            Matcher::Numeric(range) => json!({ "numeric": range.to_json() }),
            Matcher::AnythingBut(but) => json!({ "anything-but": but.to_json() }),
            Matcher::Exists(exists) => json!({ "exists": exists }),
            Matcher::Cidr(range) => json!({ "cidr": range }),
        }
    }

    /// Why EventBridge would reject this matcher, if it would
    fn problem(&self) -> Option<&'static str> {
        match self {
            Matcher::Numeric(range) if range.conditions.is_empty() => {
                Some("numeric matcher has no conditions")
            }
            Matcher::AnythingBut(AnythingBut::Values(values)) if values.is_empty() => {
                Some("anything-but matcher has no values")
            }
            Matcher::AnythingBut(AnythingBut::EqualsIgnoreCase(values))
            | Matcher::AnythingBut(AnythingBut::Wildcard(values))
                if values.is_empty() =>
            {
                Some("anything-but matcher has no values")
            }
            _ => None,
        }
    }
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Operand of an `anything-but` matcher
#[derive(Debug, Clone, PartialEq)]
pub enum AnythingBut {
    Values(Vec<Value>),
    Prefix(String),
    Suffix(String),
    EqualsIgnoreCase(Vec<String>),
    Wildcard(Vec<String>),
}

impl AnythingBut {
    fn to_json(&self) -> Value {
        match self {
            AnythingBut::Values(values) if values.len() == 1 => values[0].clone(),
            AnythingBut::Values(values) => Value::Array(values.clone()),
            AnythingBut::Prefix(p) => json!({ "prefix": p }),
            AnythingBut::Suffix(s) => json!({ "suffix": s }),
            AnythingBut::EqualsIgnoreCase(values) => json!({ "equals-ignore-case": values }),
            AnythingBut::Wildcard(values) => json!({ "wildcard": values }),
        }
    }
}

impl From<AnythingBut> for Matcher {
    fn from(but: AnythingBut) -> Self {
        Matcher::AnythingBut(but)
    }
}

/// Comparison operator in a numeric matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl NumericOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericOp::Gt => ">",
            NumericOp::Ge => ">=",
            NumericOp::Lt => "<",
            NumericOp::Le => "<=",
            NumericOp::Eq => "=",
        }
    }
}

/// Numeric range, rendered as `[op, value, op, value, ...]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Numeric {
    conditions: Vec<(NumericOp, Value)>,
}

impl Numeric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.push(NumericOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Self {
        self.push(NumericOp::Ge, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.push(NumericOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Self {
        self.push(NumericOp::Le, value)
    }

    pub fn equal(self, value: impl Into<Value>) -> Self {
        self.push(NumericOp::Eq, value)
    }

    fn push(mut self, op: NumericOp, value: impl Into<Value>) -> Self {
        self.conditions.push((op, value.into()));
        self
    }

    fn to_json(&self) -> Value {
        Value::Array(
            self.conditions
                .iter()
                .flat_map(|(op, value)| [Value::from(op.as_str()), value.clone()])
                .collect(),
        )
    }
}

/// Condition attached to one field of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Any of the matchers must match
    Match(Vec<Matcher>),
    /// Conditions on the fields of a nested object
    Nested(Filter),
}

impl FieldFilter {
    pub fn to_json(&self) -> Value {
        match self {
            FieldFilter::Match(matchers) => {
                Value::Array(matchers.iter().map(Matcher::to_json).collect())
            }
            FieldFilter::Nested(filter) => filter.to_json(),
        }
    }
}

impl Serialize for FieldFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A partial filter over the fields of an event schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, FieldFilter>,
    any_of: Vec<Filter>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `name` against any of the given matchers
    pub fn field<I>(mut self, name: impl Into<String>, matchers: I) -> Self
    where
        I: IntoIterator<Item = Matcher>,
    {
        self.fields.insert(
            name.into(),
            FieldFilter::Match(matchers.into_iter().collect()),
        );
        self
    }

    /// Shorthand for a single exact-value matcher
    pub fn equals(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field(name, [Matcher::exact(value)])
    }

    /// Apply a filter to the fields of a nested object
    pub fn nested(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.fields.insert(name.into(), FieldFilter::Nested(filter));
        self
    }

    /// Add a compound OR over the given filters
    pub fn or<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        self.any_of.extend(filters);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.any_of.is_empty()
    }

    /// Top-level field names, including those inside `$or` branches
    pub fn field_names(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self.fields.keys().map(String::as_str).collect();
        for branch in &self.any_of {
            names.extend(branch.field_names());
        }
        names
    }

    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, condition)| (name.clone(), condition.to_json()))
            .collect();
        if !self.any_of.is_empty() {
            map.insert(
                OR_KEY.to_string(),
                Value::Array(self.any_of.iter().map(Filter::to_json).collect()),
            );
        }
        Value::Object(map)
    }

    /// Reject conditions EventBridge does not accept
    ///
    /// Every field needs at least one matcher, `anything-but` needs at least
    /// one value, numeric matchers need a condition and `$or` branches must
    /// not be empty.
    pub fn validate(&self) -> BridgeResult<()> {
        for (name, condition) in &self.fields {
            match condition {
                FieldFilter::Match(matchers) if matchers.is_empty() => {
                    return Err(invalid(name, "no matchers"));
                }
                FieldFilter::Match(matchers) => {
                    if let Some(problem) = matchers.iter().find_map(Matcher::problem) {
                        return Err(invalid(name, problem));
                    }
                }
                FieldFilter::Nested(filter) if filter.is_empty() => {
                    return Err(invalid(name, "empty nested filter"));
                }
                FieldFilter::Nested(filter) => filter.validate()?,
            }
        }
        for branch in &self.any_of {
            if branch.is_empty() {
                return Err(invalid(OR_KEY, "empty branch"));
            }
            branch.validate()?;
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> BridgeError {
    BridgeError::InvalidFilter {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Something a rule pattern can target: one event definition
pub trait PatternTarget {
    fn source(&self) -> &str;

    fn detail_type(&self) -> &str;

    /// Known schema field names; empty when the schema cannot be introspected
    fn schema_fields(&self) -> Vec<String>;
}

/// The `detail` block of a pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailPattern {
    pub properties: Filter,
}

/// A compiled EventBridge event pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPattern {
    pub source: Vec<String>,

    #[serde(rename = "detail-type")]
    pub detail_type: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailPattern>,
}

impl EventPattern {
    pub fn to_json(&self) -> Value {
        let mut pattern = Map::new();
        pattern.insert("source".to_string(), Value::from(self.source.clone()));
        pattern.insert("detail-type".to_string(), Value::from(self.detail_type.clone()));
        if let Some(detail) = &self.detail {
            pattern.insert(
                "detail".to_string(),
                json!({ "properties": detail.properties.to_json() }),
            );
        }
        Value::Object(pattern)
    }

    /// Pattern as the JSON string a rule definition expects
    pub fn to_json_string(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Compile a pattern matching any of `targets`, optionally filtered
///
/// Sources are de-duplicated in first-seen order; detail-types are
/// concatenated. Filter field names are checked against the targets'
/// schemas when every schema could be introspected.
pub fn compute_pattern(
    targets: &[&dyn PatternTarget],
    filter: Option<&Filter>,
) -> BridgeResult<EventPattern> {
    if targets.is_empty() {
        return Err(BridgeError::EmptyEventList);
    }

    let mut source: Vec<String> = Vec::new();
    for target in targets {
        if !source.iter().any(|s| s == target.source()) {
            source.push(target.source().to_string());
        }
    }

    let detail_type: Vec<String> = targets
        .iter()
        .map(|t| t.detail_type().to_string())
        .collect();

    if let Some(filter) = filter {
        filter.validate()?;
        check_filter_fields(targets, filter, &detail_type)?;
    }

    debug!(
        sources = source.len(),
        detail_types = detail_type.len(),
        filtered = filter.is_some(),
        "Compiled event pattern"
    );

    Ok(EventPattern {
        source,
        detail_type,
        detail: filter.map(|f| DetailPattern {
            properties: f.clone(),
        }),
    })
}

fn check_filter_fields(
    targets: &[&dyn PatternTarget],
    filter: &Filter,
    detail_types: &[String],
) -> BridgeResult<()> {
    let mut known: BTreeSet<String> = BTreeSet::new();
    for target in targets {
        let fields = target.schema_fields();
        if fields.is_empty() {
            // Schema not introspectable; the filter passes through unchecked.
            return Ok(());
        }
        known.extend(fields);
    }

    match filter.field_names().into_iter().find(|name| !known.contains(*name)) {
        Some(field) => Err(BridgeError::UnknownField {
            event: detail_types.join(", "),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}
