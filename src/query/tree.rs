use serde::{Deserialize, Serialize};

use crate::graph::Direction;
use crate::schema::{Cardinality, FieldType, Value};

/// Loop variable a field is read from: the root document or a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Root,
    Traversal(usize),
}

/// A caller path resolved against the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    /// Path as written by the caller, e.g. `author.name`.
    pub path: String,
    pub scope: Scope,
    /// Entity type bound to `scope`.
    pub entity: String,
    /// Document attribute path below `scope`; `None` selects the whole
    /// document (a relationship path).
    pub attribute: Option<String>,
    pub field_type: Option<FieldType>,
}

impl FieldRef {
    pub fn is_document(&self) -> bool {
        self.attribute.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[serde(alias = "eq")]
    Equal,
    #[serde(alias = "ne")]
    NotEqual,
    #[serde(alias = "lt")]
    LessThan,
    #[serde(alias = "lte")]
    LessThanOrEqual,
    #[serde(alias = "gt")]
    GreaterThan,
    #[serde(alias = "gte")]
    GreaterThanOrEqual,
    Contains,
    StartsWith,
    #[serde(alias = "in_set")]
    In,
}

impl Comparison {
    /// Infix operator; `None` for comparisons rendered as a function call or
    /// membership test.
    pub fn as_aql(&self) -> Option<&'static str> {
        match self {
            Comparison::Equal => Some("=="),
            Comparison::NotEqual => Some("!="),
            Comparison::LessThan => Some("<"),
            Comparison::LessThanOrEqual => Some("<="),
            Comparison::GreaterThan => Some(">"),
            Comparison::GreaterThanOrEqual => Some(">="),
            Comparison::Contains | Comparison::StartsWith | Comparison::In => None,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// Supplied later through [`crate::CompiledQuery::bind`].
    Param { param: String },
    Literal(Value),
}

impl Operand {
    pub fn param(name: impl Into<String>) -> Self {
        Operand::Param { param: name.into() }
    }
}

impl<T: crate::schema::ToValue> From<T> for Operand {
    fn from(value: T) -> Self {
        Operand::Literal(value.to_value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: FieldRef,
        comparison: Comparison,
        operand: Operand,
    },
    IsNull {
        field: FieldRef,
        negated: bool,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_aql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub index: usize,
    pub from: Scope,
    /// Entity type at `from`.
    pub source: String,
    pub relationship: String,
    /// Entity type reached.
    pub target: String,
    pub direction: Direction,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Function name as given; checked by the compiler.
    pub function: String,
    pub field: FieldRef,
    pub group_by: Vec<FieldRef>,
}

/// Related handles loaded alongside each root document.
#[derive(Debug, Clone, PartialEq)]
pub struct Inclusion {
    pub relationship: String,
    pub target: String,
    pub direction: Direction,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Filter(Predicate),
    Project(Vec<FieldRef>),
    Order {
        fields: Vec<FieldRef>,
        direction: SortDirection,
    },
    Limit {
        count: i64,
        offset: i64,
    },
    Aggregate(Aggregation),
    Traverse(Traversal),
    Include(Inclusion),
}

/// Normalized, schema-checked description of one query. Built fresh per
/// query by [`crate::QueryBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    pub(crate) entity: String,
    pub(crate) collection: String,
    pub(crate) nodes: Vec<QueryNode>,
}

impl QueryTree {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn nodes(&self) -> &[QueryNode] {
        &self.nodes
    }

    pub fn traversals(&self) -> impl Iterator<Item = &Traversal> {
        self.nodes.iter().filter_map(|n| match n {
            QueryNode::Traverse(t) => Some(t),
            _ => None,
        })
    }

    pub fn has_traversal(&self) -> bool {
        self.traversals().next().is_some()
    }

    /// Whether rows are whole root documents (no projection or aggregate).
    pub fn returns_documents(&self) -> bool {
        !self
            .nodes
            .iter()
            .any(|n| matches!(n, QueryNode::Project(_) | QueryNode::Aggregate(_)))
    }
}
