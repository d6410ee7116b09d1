//! # Schemas
//!
//! Field layouts for packet types and the loaders for the schema IR that
//! describes them.
//!
//! A [`SchemaDescriptor`] is pure data: a stable type identifier and an
//! ordered list of [`FieldSpec`]s. The field order is the encode order; the
//! field name is the wire key.
//!
//! ## IR sources
//! - Ordered list form (JSON array, or `{"schemas": [...]}`):
//!   `[{"typeId": "/x/Y", "fields": [{"name", "kind", "required"}]}]`
//! - TOML with one `[[schemas]]` table per descriptor
//! - Packet definition documents keyed by type id, using generator type
//!   names such as `int`, `list_string` or `map_string_dynamic`
//!
//! ## Field rules
//! A field may carry [`FieldRules`] (bounds, a pattern, emptiness and
//! non-finite float policy, a depth ceiling). Packet definition documents
//! spell them as a per-field `validation` block, where `required` also
//! overrides `optional`. The document's `config.validation` section sets
//! integer and float defaults for its fields and may tighten the codec
//! limits through [`SchemaLimits`].

use crate::config::CodecLimits;
use crate::core::value::{Kind, Value};
use crate::error::{CodecError, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Reserved envelope key holding the type identifier
pub const PACKET_TYPE_KEY: &str = "packetType";

fn default_required() -> bool {
    true
}

fn default_version() -> u32 {
    1
}

/// One declared field of a packet schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Wire key
    pub name: String,
    pub kind: Kind,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Element kind for `Sequence` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "FieldRules::is_unconstrained")]
    pub rules: FieldRules,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            items: None,
            description: None,
            rules: FieldRules::default(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub fn with_items(mut self, items: Kind) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_rules(mut self, rules: FieldRules) -> Self {
        self.rules = rules;
        self
    }

    /// Check a present value against this field.
    ///
    /// `Null` satisfies optional fields and fields declared `Null` or
    /// `Dynamic`. Sequence elements are checked against `items` when set,
    /// then the value against the field's rules.
    pub fn check(&self, value: &Value) -> Result<()> {
        if value.is_null() && (!self.required || self.kind == Kind::Null) {
            return Ok(());
        }

        let actual = value.kind();
        if !self.kind.accepts(actual) {
            return Err(CodecError::FieldKindMismatch {
                name: self.name.clone(),
                expected: self.kind,
                actual,
            });
        }

        if let (Some(items), Value::Sequence(elements)) = (self.items, value) {
            for (index, element) in elements.iter().enumerate() {
                if !items.accepts(element.kind()) {
                    return Err(CodecError::FieldKindMismatch {
                        name: format!("{}[{index}]", self.name),
                        expected: items,
                        actual: element.kind(),
                    });
                }
            }
        }

        self.rules.check(&self.name, value)
    }
}

/// Regular expression a text field must match from its first character
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    regex: Regex,
}

impl FieldPattern {
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})")).map_err(|e| {
            CodecError::InvalidSchema(format!("invalid pattern {source:?}: {e}"))
        })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for FieldPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for FieldPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(source).map_err(serde::de::Error::custom)
    }
}

/// Value constraints on a declared field, checked after its kind.
///
/// `min` and `max` bound the number itself for `Int` and `Float`, the
/// character count for `Text`, the byte length for `Binary` and the entry
/// count for `Sequence` and `Mapping`. `allow_empty` applies to the same
/// sized kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<FieldPattern>,
    pub allow_empty: bool,
    pub allow_nan: bool,
    pub allow_infinity: bool,
    /// Deepest nesting allowed in the value; a flat mapping has depth 2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            pattern: None,
            allow_empty: true,
            allow_nan: true,
            allow_infinity: true,
            max_depth: None,
        }
    }
}

impl FieldRules {
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    /// Check a non-null value of field `name` against these rules
    pub fn check(&self, name: &str, value: &Value) -> Result<()> {
        match value {
            Value::Int(i) => {
                if let Some(min) = self.min.filter(|min| int_below(*i, *min)) {
                    return Err(violation(name, format!("{i} is less than minimum {min}")));
                }
                if let Some(max) = self.max.filter(|max| int_above(*i, *max)) {
                    return Err(violation(name, format!("{i} exceeds maximum {max}")));
                }
            }
            Value::Float(f) => self.check_float(name, *f)?,
            Value::Text(text) => {
                self.check_size(name, text.chars().count())?;
                if let Some(pattern) = self.pattern.as_ref().filter(|p| !p.is_match(text)) {
                    return Err(violation(
                        name,
                        format!("does not match pattern {}", pattern.as_str()),
                    ));
                }
            }
            Value::Binary(bytes) => self.check_size(name, bytes.len())?,
            Value::Sequence(items) => self.check_size(name, items.len())?,
            Value::Mapping(map) => self.check_size(name, map.len())?,
            Value::Null | Value::Bool(_) | Value::Timestamp(_) => {}
        }

        if let Some(limit) = self.max_depth {
            value
                .check_depth(limit)
                .map_err(|_| violation(name, format!("nests deeper than {limit}")))?;
        }
        Ok(())
    }

    fn check_float(&self, name: &str, f: f64) -> Result<()> {
        if f.is_nan() {
            return if self.allow_nan {
                Ok(())
            } else {
                Err(violation(name, "NaN is not allowed".to_string()))
            };
        }
        if f.is_infinite() && !self.allow_infinity {
            return Err(violation(name, "infinity is not allowed".to_string()));
        }
        if let Some(min) = self.min.filter(|min| f < *min) {
            return Err(violation(name, format!("{f} is less than minimum {min}")));
        }
        if let Some(max) = self.max.filter(|max| f > *max) {
            return Err(violation(name, format!("{f} exceeds maximum {max}")));
        }
        Ok(())
    }

    fn check_size(&self, name: &str, len: usize) -> Result<()> {
        if len == 0 && !self.allow_empty {
            return Err(violation(name, "empty value is not allowed".to_string()));
        }
        if let Some(min) = self.min.filter(|min| (len as f64) < *min) {
            return Err(violation(name, format!("size {len} is less than minimum {min}")));
        }
        if let Some(max) = self.max.filter(|max| (len as f64) > *max) {
            return Err(violation(name, format!("size {len} exceeds maximum {max}")));
        }
        Ok(())
    }
}

fn violation(name: &str, reason: String) -> CodecError {
    CodecError::ConstraintViolation {
        name: name.to_string(),
        reason,
    }
}

// 2^63, the first float above i64::MAX
const I64_END: f64 = 9_223_372_036_854_775_808.0;

/// `value < min`, exact for every i64 and float bound
fn int_below(value: i64, min: f64) -> bool {
    let min = min.ceil();
    if min >= I64_END {
        true
    } else if min <= -I64_END {
        false
    } else {
        value < min as i64
    }
}

/// `value > max`, exact for every i64 and float bound
fn int_above(value: i64, max: f64) -> bool {
    let max = max.floor();
    if max >= I64_END {
        false
    } else if max < -I64_END {
        true
    } else {
        value > max as i64
    }
}

/// Limits a schema document declares for the codec that serves it.
///
/// They only ever tighten the configured [`CodecLimits`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_collection_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_string_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_binary_len: Option<usize>,
}

impl SchemaLimits {
    pub fn tighten(&self, limits: CodecLimits) -> CodecLimits {
        let pick = |declared: Option<usize>, current: usize| declared.map_or(current, |d| d.min(current));
        CodecLimits {
            max_collection_len: pick(self.max_collection_len, limits.max_collection_len),
            max_string_len: pick(self.max_string_len, limits.max_string_len),
            max_binary_len: pick(self.max_binary_len, limits.max_binary_len),
            ..limits
        }
    }
}

/// Field layout of one packet type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub deprecated: bool,
    pub fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
    pub fn new(type_id: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            type_id: type_id.into(),
            description: None,
            version: default_version(),
            deprecated: false,
            fields,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up a declared field by wire key
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Structural checks applied before registration
    pub fn validate(&self) -> Result<()> {
        if !self.type_id.starts_with('/') || self.type_id.len() < 2 {
            return Err(CodecError::InvalidSchema(format!(
                "type id must be a non-empty path starting with '/': {:?}",
                self.type_id
            )));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(CodecError::InvalidSchema(format!(
                    "{}: field name cannot be empty",
                    self.type_id
                )));
            }
            if field.name == PACKET_TYPE_KEY {
                return Err(CodecError::InvalidSchema(format!(
                    "{}: field name {PACKET_TYPE_KEY} is reserved",
                    self.type_id
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(CodecError::InvalidSchema(format!(
                    "{}: duplicate field {}",
                    self.type_id, field.name
                )));
            }
            if field.items.is_some() && field.kind != Kind::Sequence {
                return Err(CodecError::InvalidSchema(format!(
                    "{}: field {} declares items but is not a sequence",
                    self.type_id, field.name
                )));
            }
        }

        Ok(())
    }
}

/// Map a generator type name to a kind and optional element kind
pub fn kind_for_type_name(type_name: &str) -> Result<(Kind, Option<Kind>)> {
    let mapped = match type_name {
        "int" => (Kind::Int, None),
        "float" | "double" => (Kind::Float, None),
        "string" | "time" => (Kind::Text, None),
        "bool" => (Kind::Bool, None),
        "datetime" => (Kind::Timestamp, None),
        "bytes" => (Kind::Binary, None),
        "list" => (Kind::Sequence, None),
        "list_int" => (Kind::Sequence, Some(Kind::Int)),
        "list_string" => (Kind::Sequence, Some(Kind::Text)),
        "map" | "embedded_map" | "map_string_dynamic" => (Kind::Mapping, None),
        "any" | "dynamic" => (Kind::Dynamic, None),
        other => {
            return Err(CodecError::InvalidSchema(format!(
                "unknown field type: {other}"
            )))
        }
    };
    Ok(mapped)
}

/// An ordered collection of schema descriptors loaded from an external source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaIr {
    pub schemas: Vec<SchemaDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<SchemaLimits>,
}

/// JSON object forms: `{"schemas": [...]}` or `{"packets": {...}}`
#[derive(Deserialize)]
struct JsonIrDocument {
    #[serde(default)]
    schemas: Option<Vec<SchemaDescriptor>>,
    #[serde(default)]
    limits: Option<SchemaLimits>,
    #[serde(default)]
    packets: Option<IndexMap<String, PacketDefinition>>,
    #[serde(default)]
    config: GeneratorConfig,
}

#[derive(Deserialize)]
struct PacketDefinitions {
    packets: IndexMap<String, PacketDefinition>,
    #[serde(default)]
    config: GeneratorConfig,
}

#[derive(Deserialize, Default)]
struct GeneratorConfig {
    #[serde(default)]
    validation: GeneratorValidation,
}

/// Document-wide `config.validation` section
#[derive(Deserialize, Default)]
struct GeneratorValidation {
    min_int: Option<i64>,
    max_int: Option<i64>,
    max_list_size: Option<usize>,
    max_map_size: Option<usize>,
    max_string_length: Option<usize>,
    max_bytes_length: Option<usize>,
    allow_nan: Option<bool>,
    allow_infinity: Option<bool>,
}

impl GeneratorValidation {
    fn limits(&self) -> Option<SchemaLimits> {
        let collection = match (self.max_list_size, self.max_map_size) {
            (Some(list), Some(map)) => Some(list.min(map)),
            (list, map) => list.or(map),
        };
        let limits = SchemaLimits {
            max_collection_len: collection,
            max_string_len: self.max_string_length,
            max_binary_len: self.max_bytes_length,
        };
        (limits != SchemaLimits::default()).then_some(limits)
    }
}

#[derive(Deserialize)]
struct PacketDefinition {
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    fields: IndexMap<String, Json>,
}

/// Field entry: either a bare type name or an object
#[derive(Deserialize, Default)]
struct FieldDefinition {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    validation: FieldValidation,
}

#[derive(Deserialize, Default)]
struct FieldValidation {
    required: Option<bool>,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<String>,
    allow_empty: Option<bool>,
    allow_nan: Option<bool>,
    allow_infinity: Option<bool>,
    max_depth: Option<usize>,
}

impl FieldDefinition {
    fn parse(name: &str, raw: Json) -> Result<Self> {
        match raw {
            Json::String(type_name) => Ok(Self {
                type_name,
                ..Self::default()
            }),
            other => serde_json::from_value(other).map_err(|e| {
                CodecError::InvalidSchema(format!("Failed to parse field {name}: {e}"))
            }),
        }
    }

    fn into_spec(self, name: String, defaults: &GeneratorValidation) -> Result<FieldSpec> {
        let (kind, items) = kind_for_type_name(&self.type_name)?;
        let validation = self.validation;
        let mut rules = FieldRules {
            min: validation.min,
            max: validation.max,
            pattern: validation.pattern.map(FieldPattern::new).transpose()?,
            allow_empty: validation.allow_empty.unwrap_or(true),
            allow_nan: validation.allow_nan.or(defaults.allow_nan).unwrap_or(true),
            allow_infinity: validation
                .allow_infinity
                .or(defaults.allow_infinity)
                .unwrap_or(true),
            max_depth: validation.max_depth,
        };
        if kind == Kind::Int {
            rules.min = rules.min.or(defaults.min_int.map(|v| v as f64));
            rules.max = rules.max.or(defaults.max_int.map(|v| v as f64));
        }

        Ok(FieldSpec {
            name,
            kind,
            required: validation.required.unwrap_or(!self.optional),
            items,
            description: self.description,
            rules,
        })
    }
}

impl SchemaIr {
    pub fn new(schemas: Vec<SchemaDescriptor>) -> Self {
        Self {
            schemas,
            limits: None,
        }
    }

    /// Apply the document's declared limits, if any, to `limits`
    pub fn tighten(&self, limits: CodecLimits) -> CodecLimits {
        self.limits.map_or(limits, |declared| declared.tighten(limits))
    }

    /// Parse the JSON list form, the `{"schemas": [...]}` wrapper, or a
    /// packet definition document
    pub fn from_json(content: &str) -> Result<Self> {
        if content.trim_start().starts_with('[') {
            let schemas: Vec<SchemaDescriptor> = serde_json::from_str(content)
                .map_err(|e| CodecError::InvalidSchema(format!("Failed to parse schema IR: {e}")))?;
            return Ok(Self::new(schemas));
        }

        let doc: JsonIrDocument = serde_json::from_str(content)
            .map_err(|e| CodecError::InvalidSchema(format!("Failed to parse schema IR: {e}")))?;
        match (doc.schemas, doc.packets) {
            (Some(schemas), None) => Ok(Self {
                schemas,
                limits: doc.limits,
            }),
            (None, Some(packets)) => Self::from_definitions(packets, doc.config.validation),
            (Some(_), Some(_)) => Err(CodecError::InvalidSchema(
                "schema IR cannot contain both schemas and packets".to_string(),
            )),
            (None, None) => Err(CodecError::InvalidSchema(
                "schema IR has neither schemas nor packets".to_string(),
            )),
        }
    }

    /// Parse TOML with one `[[schemas]]` table per descriptor
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| CodecError::InvalidSchema(format!("Failed to parse schema TOML: {e}")))
    }

    /// Parse a packet definition document (`{"packets": {"/x/Y": {...}}}`)
    pub fn from_packet_definitions(content: &str) -> Result<Self> {
        let doc: PacketDefinitions = serde_json::from_str(content).map_err(|e| {
            CodecError::InvalidSchema(format!("Failed to parse packet definitions: {e}"))
        })?;
        Self::from_definitions(doc.packets, doc.config.validation)
    }

    /// Load from a file, choosing the parser by extension (`.toml` or JSON)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    fn from_definitions(
        packets: IndexMap<String, PacketDefinition>,
        defaults: GeneratorValidation,
    ) -> Result<Self> {
        let mut schemas = Vec::with_capacity(packets.len());
        for (type_id, definition) in packets {
            let mut fields = Vec::with_capacity(definition.fields.len());
            for (name, raw) in definition.fields {
                let field = FieldDefinition::parse(&name, raw)?;
                fields.push(field.into_spec(name, &defaults)?);
            }
            schemas.push(SchemaDescriptor {
                type_id,
                description: definition.description,
                version: definition.version,
                deprecated: definition.deprecated,
                fields,
            });
        }
        Ok(Self {
            schemas,
            limits: defaults.limits(),
        })
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaDescriptor> {
        self.schemas.iter()
    }
}

impl IntoIterator for SchemaIr {
    type Item = SchemaDescriptor;
    type IntoIter = std::vec::IntoIter<SchemaDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.into_iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_list_form() {
        let ir = SchemaIr::from_json(
            r#"[{"typeId": "/t/A", "fields": [
                {"name": "id", "kind": "int", "required": true},
                {"name": "note", "kind": "text", "required": false}
            ]}]"#,
        )
        .unwrap();
        assert_eq!(ir.len(), 1);
        let schema = &ir.schemas[0];
        assert_eq!(schema.type_id, "/t/A");
        assert_eq!(schema.version, 1);
        assert!(schema.fields[0].required);
        assert!(!schema.fields[1].required);
    }

    #[test]
    fn test_packet_definitions_keep_field_order() {
        let ir = SchemaIr::from_packet_definitions(
            r#"{"packets": {"/test/OptionalPacket": {
                "description": "Packet with optional fields",
                "fields": {
                    "required_field": {"type": "string"},
                    "optional_field": {"type": "int", "optional": true},
                    "tags": "list_string",
                    "avatar": {"type": "bytes", "optional": true,
                               "validation": {"max": 1048576}}
                }
            }}}"#,
        )
        .unwrap();
        let schema = &ir.schemas[0];
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["required_field", "optional_field", "tags", "avatar"]);
        assert_eq!(schema.fields[1].kind, Kind::Int);
        assert!(!schema.fields[1].required);
        assert_eq!(schema.fields[2].items, Some(Kind::Text));
        assert_eq!(schema.fields[3].kind, Kind::Binary);
    }

    #[test]
    fn test_from_json_detects_definitions() {
        let ir = SchemaIr::from_json(r#"{"packets": {"/s/P": {"fields": {"m": "string"}}}}"#)
            .unwrap();
        assert_eq!(ir.schemas[0].fields[0].kind, Kind::Text);
    }

    #[test]
    fn test_unknown_generator_type() {
        assert!(matches!(
            SchemaIr::from_packet_definitions(r#"{"packets": {"/s/P": {"fields": {"m": "uuid"}}}}"#),
            Err(CodecError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_toml_form() {
        let ir = SchemaIr::from_toml(
            r#"
            [[schemas]]
            typeId = "/t/Toml"
            fields = [
                { name = "id", kind = "int" },
                { name = "tags", kind = "sequence", items = "text", required = false },
            ]
            "#,
        )
        .unwrap();
        assert_eq!(ir.schemas[0].fields[1].items, Some(Kind::Text));
        assert!(ir.schemas[0].fields[0].required);
    }

    #[test]
    fn test_reserved_field_rejected() {
        let schema = SchemaDescriptor::new(
            "/t/Bad",
            vec![FieldSpec::required(PACKET_TYPE_KEY, Kind::Text)],
        );
        assert!(matches!(schema.validate(), Err(CodecError::InvalidSchema(_))));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let schema = SchemaDescriptor::new(
            "/t/Dup",
            vec![
                FieldSpec::required("a", Kind::Int),
                FieldSpec::optional("a", Kind::Text),
            ],
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_type_id_must_be_path() {
        assert!(SchemaDescriptor::new("Ping", vec![]).validate().is_err());
        assert!(SchemaDescriptor::new("/", vec![]).validate().is_err());
        assert!(SchemaDescriptor::new("/x/Ping", vec![]).validate().is_ok());
    }

    #[test]
    fn test_items_only_on_sequences() {
        let schema = SchemaDescriptor::new(
            "/t/Items",
            vec![FieldSpec::required("n", Kind::Int).with_items(Kind::Int)],
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_field_check() {
        let tags = FieldSpec::required("tags", Kind::Sequence).with_items(Kind::Text);
        assert!(tags.check(&Value::sequence(["a", "b"])).is_ok());
        assert!(matches!(
            tags.check(&Value::sequence([Value::from("a"), Value::Int(2)])),
            Err(CodecError::FieldKindMismatch { name, expected: Kind::Text, actual: Kind::Int })
                if name == "tags[1]"
        ));

        let age = FieldSpec::optional("age", Kind::Int);
        assert!(age.check(&Value::Null).is_ok());
        assert!(FieldSpec::required("age", Kind::Int).check(&Value::Null).is_err());
        assert!(FieldSpec::required("any", Kind::Dynamic).check(&Value::Null).is_ok());
    }

    fn violated(result: Result<()>) -> bool {
        matches!(result, Err(CodecError::ConstraintViolation { .. }))
    }

    #[test]
    fn test_numeric_bounds() {
        let rules = FieldRules {
            min: Some(1.0),
            max: Some(999_999.0),
            ..FieldRules::default()
        };
        let user_id = FieldSpec::required("user_id", Kind::Int).with_rules(rules);
        assert!(user_id.check(&Value::Int(1)).is_ok());
        assert!(user_id.check(&Value::Int(999_999)).is_ok());
        assert!(violated(user_id.check(&Value::Int(-5))));
        assert!(violated(user_id.check(&Value::Int(1_000_000))));

        // bounds at the edge of i64 stay exact
        let wide = FieldRules {
            min: Some(i64::MIN as f64),
            max: Some(i64::MAX as f64),
            ..FieldRules::default()
        };
        assert!(wide.check("n", &Value::Int(i64::MIN)).is_ok());
        assert!(wide.check("n", &Value::Int(i64::MAX)).is_ok());
    }

    #[test]
    fn test_float_policy() {
        let balance = FieldRules {
            min: Some(0.0),
            allow_nan: false,
            allow_infinity: false,
            ..FieldRules::default()
        };
        assert!(balance.check("balance", &Value::Float(0.0)).is_ok());
        assert!(violated(balance.check("balance", &Value::Float(-0.5))));
        assert!(violated(balance.check("balance", &Value::Float(f64::NAN))));
        assert!(violated(balance.check("balance", &Value::Float(f64::INFINITY))));

        let open = FieldRules::default();
        assert!(open.check("x", &Value::Float(f64::NAN)).is_ok());
        assert!(open.check("x", &Value::Float(f64::NEG_INFINITY)).is_ok());
    }

    #[test]
    fn test_sizes_and_pattern() {
        let username = FieldRules {
            min: Some(3.0),
            max: Some(30.0),
            pattern: Some(FieldPattern::new("^[a-zA-Z0-9_]+$").unwrap()),
            allow_empty: false,
            ..FieldRules::default()
        };
        assert!(username.check("username", &Value::from("alice_1")).is_ok());
        assert!(violated(username.check("username", &Value::from("al"))));
        assert!(violated(username.check("username", &Value::from(""))));
        assert!(violated(username.check("username", &Value::from("bad name"))));

        // character count, not bytes
        assert!(username.check("username", &Value::from("ééé")).is_err());
        let short = FieldRules {
            max: Some(3.0),
            ..FieldRules::default()
        };
        assert!(short.check("s", &Value::from("ééé")).is_ok());

        let tags = FieldRules {
            max: Some(2.0),
            ..FieldRules::default()
        };
        assert!(tags.check("tags", &Value::sequence(["a", "b"])).is_ok());
        assert!(violated(tags.check("tags", &Value::sequence(["a", "b", "c"]))));
        assert!(violated(tags.check("avatar", &Value::binary([0u8; 3]))));
    }

    #[test]
    fn test_pattern_matches_from_start() {
        let pattern = FieldPattern::new("[0-9]+").unwrap();
        assert!(pattern.is_match("42abc"));
        assert!(!pattern.is_match("abc42"));
        assert!(matches!(FieldPattern::new("("), Err(CodecError::InvalidSchema(_))));
    }

    #[test]
    fn test_max_depth_rule() {
        let settings = FieldRules {
            max_depth: Some(2),
            ..FieldRules::default()
        };
        let flat = Value::mapping([("theme", Value::from("dark"))]);
        let nested = Value::mapping([("ui", flat.clone())]);
        assert!(settings.check("settings", &flat).is_ok());
        assert!(violated(settings.check("settings", &nested)));
    }

    #[test]
    fn test_validation_block_parsed() {
        let ir = SchemaIr::from_packet_definitions(
            r#"{"packets": {"/t/V": {"fields": {
                "id": {"type": "int", "validation": {"min": 1}},
                "bio": {"type": "string", "validation": {"required": false, "max": 5}},
                "nick": {"type": "string", "optional": true, "validation": {"required": true}},
                "ratio": "double"
            }}},
            "config": {"validation": {"max_int": 100, "allow_nan": false,
                                      "max_list_size": 50, "max_map_size": 20}}}"#,
        )
        .unwrap();
        let schema = &ir.schemas[0];
        assert_eq!(schema.fields[0].rules.min, Some(1.0));
        assert_eq!(schema.fields[0].rules.max, Some(100.0));
        assert!(!schema.fields[1].required);
        assert_eq!(schema.fields[1].rules.max, Some(5.0));
        assert!(schema.fields[2].required);
        assert!(!schema.fields[3].rules.allow_nan);
        assert_eq!(
            ir.limits,
            Some(SchemaLimits {
                max_collection_len: Some(20),
                ..SchemaLimits::default()
            })
        );
        assert!(schema.required_fields().map(|f| f.name.as_str()).eq(["id", "nick"]));
    }

    #[test]
    fn test_declared_limits_only_tighten() {
        let declared = SchemaLimits {
            max_string_len: Some(64),
            max_binary_len: Some(usize::MAX),
            ..SchemaLimits::default()
        };
        let base = CodecLimits::default();
        let limits = declared.tighten(base);
        assert_eq!(limits.max_string_len, 64);
        assert_eq!(limits.max_binary_len, base.max_binary_len);
        assert_eq!(limits.max_collection_len, base.max_collection_len);
        assert_eq!(SchemaIr::new(vec![]).tighten(base), base);
    }

    #[test]
    fn test_rules_in_list_form() {
        let ir = SchemaIr::from_json(
            r#"{"schemas": [{"typeId": "/t/R", "fields": [
                {"name": "code", "kind": "text", "rules": {"pattern": "[A-Z]{3}", "allow_empty": false}}
            ]}], "limits": {"max_string_len": 128}}"#,
        )
        .unwrap();
        let code = &ir.schemas[0].fields[0];
        assert!(code.check(&Value::from("ABC")).is_ok());
        assert!(violated(code.check(&Value::from("abc"))));
        assert_eq!(ir.limits.and_then(|l| l.max_string_len), Some(128));
        assert!(ir.schemas[0].fields.iter().all(|f| f.description.is_none()));
    }
}
