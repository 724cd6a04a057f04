use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ToValue, Value};

/// Name of the implicit key attribute every entity carries. Maps to `_key`.
pub const KEY_FIELD: &str = "id";

/// Attribute names owned by the backend or by the implicit key.
pub const RESERVED_NAMES: &[&str] = &[KEY_FIELD, "_key", "_id", "_from", "_to", "_rev"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// Arbitrary JSON: arrays, nested objects.
    Json,
}

impl FieldType {
    /// Whether a literal of this shape may be compared against the field.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::Json, _) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Integer, Value::Int(_)) => true,
            (FieldType::Float, Value::Int(_) | Value::Float(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::DateTime, Value::Timestamp(_) | Value::String(_)) => true,
            _ => false,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
            FieldType::Json => "json",
        };
        f.write_str(name)
    }
}

/// Maps a Rust field type onto a [`FieldType`]. Used by `#[derive(Entity)]`.
pub trait FieldKind {
    const FIELD_TYPE: FieldType;
    const NULLABLE: bool = false;
}

macro_rules! field_kind {
    ($field_type:expr => $($ty:ty),+) => {
        $(impl FieldKind for $ty {
            const FIELD_TYPE: FieldType = $field_type;
        })+
    };
}

field_kind!(FieldType::String => String);
field_kind!(FieldType::Integer => i8, i16, i32, i64, u8, u16, u32);
field_kind!(FieldType::Float => f32, f64);
field_kind!(FieldType::Boolean => bool);
field_kind!(FieldType::DateTime => DateTime<Utc>);
field_kind!(FieldType::Json => serde_json::Value);

impl<T> FieldKind for Vec<T> {
    const FIELD_TYPE: FieldType = FieldType::Json;
}

impl<T: FieldKind> FieldKind for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;
}

/// A declared scalar attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    field_type: FieldType,
    nullable: bool,
    default: Option<Value>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            default: None,
        }
    }

    pub fn of<T: FieldKind>(name: impl Into<String>) -> Self {
        Self::new(name, T::FIELD_TYPE).nullable_if(T::NULLABLE)
    }

    pub fn nullable(self) -> Self {
        self.nullable_if(true)
    }

    pub fn nullable_if(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, value: impl ToValue) -> Self {
        self.default = Some(value.to_value());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Absent from a stored document means the data is corrupt.
    pub fn is_required(&self) -> bool {
        !self.nullable
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// A directed, named link from the declaring entity to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    name: String,
    target: String,
    graph: Option<String>,
    related_name: Option<String>,
    cardinality: Cardinality,
    edge_collection: Option<String>,
}

impl Relationship {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            graph: None,
            related_name: None,
            cardinality: Cardinality::One,
            edge_collection: None,
        }
    }

    /// Graph-name hint. Reciprocal declarations sharing a hint pair up.
    pub fn graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    /// Reverse accessor registered on the target entity.
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }

    pub fn many(mut self) -> Self {
        self.cardinality = Cardinality::Many;
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn edge_collection(mut self, collection: impl Into<String>) -> Self {
        self.edge_collection = Some(collection.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn graph_hint(&self) -> Option<&str> {
        self.graph.as_deref()
    }

    pub fn reverse_name(&self) -> Option<&str> {
        self.related_name.as_deref()
    }

    pub fn kind(&self) -> Cardinality {
        self.cardinality
    }

    pub fn declared_edge_collection(&self) -> Option<&str> {
        self.edge_collection.as_deref()
    }
}

/// A declared record shape. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityType {
    name: String,
    collection: Option<String>,
    attributes: Vec<Attribute>,
    relationships: Vec<Relationship>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared collection, else the lowercase type name.
    pub fn collection_name(&self) -> String {
        self.collection
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn get_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// Implemented by `#[derive(Entity)]` to produce the static declaration of a
/// struct.
pub trait EntityDecl {
    const TYPE: &'static str;

    fn entity_type() -> EntityType;
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn is_graph_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
