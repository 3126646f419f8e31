// Copyright (c) 2025 - Cowboy AI, Inc.
//! Input-transformer inference
//!
//! An EventBridge input transformer is a pair of an input-paths map (logical
//! name to JSON path into the delivered event) and a template referencing
//! those names as `<name>`. Rather than writing both by hand, a transform is
//! written as a plain function over two proxies:
//!
//! - [`PropertiesProxy`]: the event's schema properties
//! - [`SystemProxy`]: the envelope fields EventBridge adds (id, time, ...)
//!
//! The function runs once. Every read returns a [`Placeholder`] whose value
//! is a unique sentinel string, and the read is recorded. Serializing a proxy
//! itself (instead of reading fields) counts as using every field. The
//! function's result is serialized and each sentinel becomes `<name>`.
//!
//! ```rust
//! use eventbridge_typed::transform::infer_transformer;
//! use serde_json::json;
//!
//! let fields = vec!["order_id".to_string(), "total".to_string()];
//! let transformer = infer_transformer(&fields, |props, system| {
//!     json!({ "order": props.get("order_id"), "at": system.time() })
//! })
//! .unwrap();
//!
//! assert_eq!(transformer.input_template, r#"{"at":<event_time>,"order":<order_id>}"#);
//! assert_eq!(transformer.input_paths_map["order_id"], "$.detail.properties.order_id");
//! assert_eq!(transformer.input_paths_map["event_time"], "$.time");
//! ```

use serde::{Deserialize, Serialize, Serializer};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{BridgeError, BridgeResult};

/// JSON path of the schema properties inside a delivered event
pub const PROPERTIES_PATH: &str = "$.detail.properties";

/// Prefix applied to input-path keys of envelope fields
pub const SYSTEM_KEY_PREFIX: &str = "event_";

/// Envelope fields EventBridge adds to every delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemField {
    Version,
    Id,
    DetailType,
    Source,
    Account,
    Time,
    Region,
    Resources,
}

impl SystemField {
    pub const ALL: [SystemField; 8] = [
        SystemField::Version,
        SystemField::Id,
        SystemField::DetailType,
        SystemField::Source,
        SystemField::Account,
        SystemField::Time,
        SystemField::Region,
        SystemField::Resources,
    ];

    /// Field name in the delivered envelope
    pub fn name(&self) -> &'static str {
        match self {
            SystemField::Version => "version",
            SystemField::Id => "id",
            SystemField::DetailType => "detail-type",
            SystemField::Source => "source",
            SystemField::Account => "account",
            SystemField::Time => "time",
            SystemField::Region => "region",
            SystemField::Resources => "resources",
        }
    }

    /// Input-path key, e.g. `event_detail_type`
    pub fn key(&self) -> String {
        format!("{}{}", SYSTEM_KEY_PREFIX, self.name().replace('-', "_"))
    }

    /// JSON path, e.g. `$.detail-type`
    pub fn path(&self) -> String {
        format!("$.{}", self.name())
    }
}

impl fmt::Display for SystemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Generates sentinel strings unique to one inference run
#[derive(Debug)]
struct Sentinels {
    nonce: String,
}

impl Sentinels {
    fn new() -> Self {
        Self {
            nonce: Uuid::now_v7().simple().to_string(),
        }
    }

    /// Keyed by read order so field names never need JSON escaping
    fn property(&self, index: usize) -> String {
        format!("@@ebt-{}-p{}@@", self.nonce, index)
    }

    fn system(&self, field: SystemField) -> String {
        format!("@@ebt-{}-s{}@@", self.nonce, field as u8)
    }

    fn all_properties(&self) -> String {
        format!("@@ebt-{}-p*@@", self.nonce)
    }

    fn all_system(&self) -> String {
        format!("@@ebt-{}-s*@@", self.nonce)
    }
}

/// Value returned by a proxy read
///
/// Serializes as its sentinel, and displays as it too, so it can be placed
/// directly in a JSON value or formatted into a larger string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder(String);

impl Placeholder {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Placeholder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl From<Placeholder> for serde_json::Value {
    fn from(placeholder: Placeholder) -> Self {
        serde_json::Value::String(placeholder.0)
    }
}

/// Stand-in for an event's schema properties
pub struct PropertiesProxy<'a> {
    sentinels: &'a Sentinels,
    fields: &'a [String],
    reads: RefCell<Vec<String>>,
}

impl<'a> PropertiesProxy<'a> {
    fn new(sentinels: &'a Sentinels, fields: &'a [String]) -> Self {
        Self {
            sentinels,
            fields,
            reads: RefCell::new(Vec::new()),
        }
    }

    /// Read one property
    pub fn get(&self, field: &str) -> Placeholder {
        if !self.fields.is_empty() && !self.fields.iter().any(|f| f == field) {
            warn!(field = %field, "Transform reads a field the schema does not declare");
        }
        let mut reads = self.reads.borrow_mut();
        let index = match reads.iter().position(|read| read == field) {
            Some(index) => index,
            None => {
                reads.push(field.to_string());
                reads.len() - 1
            }
        };
        Placeholder(self.sentinels.property(index))
    }

    /// Schema fields known to this proxy
    pub fn fields(&self) -> &[String] {
        self.fields
    }
}

impl Serialize for PropertiesProxy<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.sentinels.all_properties())
    }
}

/// Stand-in for the envelope fields of a delivered event
pub struct SystemProxy<'a> {
    sentinels: &'a Sentinels,
    reads: RefCell<BTreeSet<SystemField>>,
}

impl<'a> SystemProxy<'a> {
    fn new(sentinels: &'a Sentinels) -> Self {
        Self {
            sentinels,
            reads: RefCell::new(BTreeSet::new()),
        }
    }

    /// Read one envelope field
    pub fn get(&self, field: SystemField) -> Placeholder {
        self.reads.borrow_mut().insert(field);
        Placeholder(self.sentinels.system(field))
    }

    pub fn version(&self) -> Placeholder {
        self.get(SystemField::Version)
    }

    pub fn id(&self) -> Placeholder {
        self.get(SystemField::Id)
    }

    pub fn detail_type(&self) -> Placeholder {
        self.get(SystemField::DetailType)
    }

    pub fn source(&self) -> Placeholder {
        self.get(SystemField::Source)
    }

    pub fn account(&self) -> Placeholder {
        self.get(SystemField::Account)
    }

    pub fn time(&self) -> Placeholder {
        self.get(SystemField::Time)
    }

    pub fn region(&self) -> Placeholder {
        self.get(SystemField::Region)
    }

    pub fn resources(&self) -> Placeholder {
        self.get(SystemField::Resources)
    }
}

impl Serialize for SystemProxy<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.sentinels.all_system())
    }
}

/// Input transformer for an EventBridge rule target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputTransformer {
    pub input_paths_map: BTreeMap<String, String>,
    pub input_template: String,
}

/// Infer an input transformer from a transform over placeholder proxies
///
/// `fields` are the schema's known properties; they are substituted when the
/// transform uses the whole properties proxy. The transform is invoked
/// exactly once.
pub fn infer_transformer<F, R>(fields: &[String], transform: F) -> BridgeResult<InputTransformer>
where
    F: FnOnce(&PropertiesProxy<'_>, &SystemProxy<'_>) -> R,
    R: Serialize,
{
    let sentinels = Sentinels::new();
    let props = PropertiesProxy::new(&sentinels, fields);
    let system = SystemProxy::new(&sentinels);

    let output = transform(&props, &system);
    let mut template = serde_json::to_string(&output)?;

    let reads = props.reads.take();
    let mut used_props: BTreeSet<String> = reads.iter().cloned().collect();
    let mut used_system = system.reads.take();

    let all_props = quoted(&sentinels.all_properties());
    if template.contains(&all_props) {
        if fields.is_empty() {
            warn!("Transform uses the whole properties object but the schema declares no fields");
        }
        used_props.extend(fields.iter().cloned());
        let object = object_template(fields.iter().map(|f| (f.clone(), f.clone())))?;
        template = template.replace(&all_props, &object);
    }

    let all_system = quoted(&sentinels.all_system());
    if template.contains(&all_system) {
        used_system.extend(SystemField::ALL);
        let object = object_template(
            SystemField::ALL
                .iter()
                .map(|f| (f.name().to_string(), f.key())),
        )?;
        template = template.replace(&all_system, &object);
    }

    let mut input_paths_map = BTreeMap::new();
    // (sentinel, key) pairs; longest sentinel first so a sentinel that is a
    // prefix of another never consumes part of it.
    let mut substitutions: Vec<(String, String)> = Vec::new();

    for field in &used_props {
        input_paths_map.insert(field.clone(), format!("{}.{}", PROPERTIES_PATH, field));
    }
    for (index, field) in reads.iter().enumerate() {
        substitutions.push((sentinels.property(index), field.clone()));
    }

    for field in &used_system {
        let key = field.key();
        if input_paths_map.contains_key(&key) {
            return Err(BridgeError::TemplateKeyCollision(format!(
                "property '{}' clashes with envelope field '{}'",
                key,
                field.name()
            )));
        }
        input_paths_map.insert(key.clone(), field.path());
        substitutions.push((sentinels.system(*field), key));
    }

    substitutions.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    for (sentinel, key) in &substitutions {
        let placeholder = format!("<{}>", key);
        template = template
            .replace(&quoted(sentinel), &placeholder)
            .replace(sentinel.as_str(), &placeholder);
    }

    debug!(
        paths = input_paths_map.len(),
        properties = used_props.len(),
        system = used_system.len(),
        "Inferred input transformer"
    );

    Ok(InputTransformer {
        input_paths_map,
        input_template: template,
    })
}

fn quoted(sentinel: &str) -> String {
    format!("\"{}\"", sentinel)
}

/// `{"name":<key>,...}` for a whole-object substitution
fn object_template<I>(pairs: I) -> BridgeResult<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut parts = Vec::new();
    for (name, key) in pairs {
        parts.push(format!("{}:<{}>", serde_json::to_string(&name)?, key));
    }
    Ok(format!("{{{}}}", parts.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_single_field_read() {
        let schema = fields(&["order_id", "total"]);
        let transformer =
            infer_transformer(&schema, |props, _| json!({ "id": props.get("order_id") })).unwrap();

        assert_eq!(
            transformer.input_paths_map,
            BTreeMap::from([(
                "order_id".to_string(),
                "$.detail.properties.order_id".to_string()
            )])
        );
        assert_eq!(transformer.input_template, r#"{"id":<order_id>}"#);
    }

    #[test]
    fn test_whole_properties_proxy_uses_every_field() {
        let schema = fields(&["order_id", "total"]);
        let transformer = infer_transformer(&schema, |props, _| json!({ "order": props })).unwrap();

        assert_eq!(
            transformer.input_paths_map.keys().collect::<Vec<_>>(),
            vec!["order_id", "total"]
        );
        assert_eq!(
            transformer.input_template,
            r#"{"order":{"order_id":<order_id>,"total":<total>}}"#
        );
    }

    #[test]
    fn test_proxy_returned_directly() {
        let schema = fields(&["a"]);
        let transformer = infer_transformer(&schema, |props, _| props.get("a")).unwrap();
        assert_eq!(transformer.input_template, "<a>");
    }

    #[test]
    fn test_placeholder_inside_string() {
        let schema = fields(&["order_id"]);
        let transformer = infer_transformer(&schema, |props, system| {
            json!({ "text": format!("Order {} received from {}", props.get("order_id"), system.source()) })
        })
        .unwrap();

        assert_eq!(
            transformer.input_template,
            r#"{"text":"Order <order_id> received from <event_source>"}"#
        );
        assert_eq!(transformer.input_paths_map["event_source"], "$.source");
    }

    #[test]
    fn test_system_fields_map_to_envelope_paths() {
        let transformer = infer_transformer(&[], |_, system| {
            json!([system.id(), system.detail_type(), system.time()])
        })
        .unwrap();

        assert_eq!(
            transformer.input_paths_map,
            BTreeMap::from([
                ("event_id".to_string(), "$.id".to_string()),
                ("event_detail_type".to_string(), "$.detail-type".to_string()),
                ("event_time".to_string(), "$.time".to_string()),
            ])
        );
        assert_eq!(
            transformer.input_template,
            "[<event_id>,<event_detail_type>,<event_time>]"
        );
    }

    #[test]
    fn test_whole_system_proxy() {
        let transformer = infer_transformer(&[], |_, system| json!({ "meta": system })).unwrap();
        assert_eq!(transformer.input_paths_map.len(), SystemField::ALL.len());
        assert!(transformer
            .input_template
            .contains(r#""detail-type":<event_detail_type>"#));
    }

    #[test]
    fn test_prefix_sentinels_do_not_clash() {
        let schema = fields(&["a", "a_"]);
        let transformer =
            infer_transformer(&schema, |props, _| json!([props.get("a_"), props.get("a")])).unwrap();
        assert_eq!(transformer.input_template, "[<a_>,<a>]");
    }

    #[test]
    fn test_field_names_needing_escapes_are_substituted() {
        let schema = fields(&["a\"b", "c\\d"]);
        let transformer = infer_transformer(&schema, |props, _| {
            json!({ "x": props.get("a\"b"), "y": format!("at {}", props.get("c\\d")) })
        })
        .unwrap();

        assert!(!transformer.input_template.contains("@@ebt-"));
        assert_eq!(transformer.input_template, r#"{"x":<a"b>,"y":"at <c\d>"}"#);
        assert_eq!(transformer.input_paths_map.len(), 2);
    }

    #[test]
    fn test_whole_properties_without_known_fields() {
        let transformer = infer_transformer(&[], |props, _| json!({ "o": props })).unwrap();

        assert!(transformer.input_paths_map.is_empty());
        assert_eq!(transformer.input_template, r#"{"o":{}}"#);
    }

    #[test]
    fn test_property_colliding_with_system_key() {
        let schema = fields(&["event_id"]);
        let err = infer_transformer(&schema, |props, system| {
            json!([props.get("event_id"), system.id()])
        })
        .unwrap_err();
        assert!(matches!(err, BridgeError::TemplateKeyCollision(_)));
    }

    #[test]
    fn test_unread_fields_not_mapped() {
        let schema = fields(&["a", "b", "c"]);
        let transformer =
            infer_transformer(&schema, |props, _| json!({ "b": props.get("b"), "fixed": 1 })).unwrap();
        assert_eq!(transformer.input_paths_map.len(), 1);
        assert_eq!(transformer.input_template, r#"{"b":<b>,"fixed":1}"#);
    }

    #[test]
    fn test_transformer_serializes_for_rule_targets() {
        let transformer = InputTransformer {
            input_paths_map: BTreeMap::from([("a".to_string(), "$.detail.properties.a".to_string())]),
            input_template: "<a>".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&transformer).unwrap(),
            json!({
                "InputPathsMap": {"a": "$.detail.properties.a"},
                "InputTemplate": "<a>"
            })
        );
    }
}
