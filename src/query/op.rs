use serde::{Deserialize, Serialize};

use super::tree::{Comparison, Operand, SortDirection};

/// Unresolved filter condition over caller paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Compare {
        path: String,
        op: Comparison,
        value: Operand,
    },
    IsNull {
        path: String,
        #[serde(default)]
        negated: bool,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

impl Condition {
    pub fn compare(path: impl Into<String>, op: Comparison, value: impl Into<Operand>) -> Self {
        Condition::Compare {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::Equal, value)
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::NotEqual, value)
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::LessThan, value)
    }

    pub fn lte(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::LessThanOrEqual, value)
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::GreaterThan, value)
    }

    pub fn gte(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::GreaterThanOrEqual, value)
    }

    pub fn contains(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::Contains, value)
    }

    pub fn starts_with(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::StartsWith, value)
    }

    pub fn in_set(path: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(path, Comparison::In, value)
    }

    pub fn is_null(path: impl Into<String>) -> Self {
        Condition::IsNull {
            path: path.into(),
            negated: false,
        }
    }

    pub fn not_null(path: impl Into<String>) -> Self {
        Condition::IsNull {
            path: path.into(),
            negated: true,
        }
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::All {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Any {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn negate(self) -> Self {
        Condition::Not {
            condition: Box::new(self),
        }
    }
}

fn one() -> u32 {
    1
}

/// One step of a caller's operation list. Deserializable from JSON, e.g.
/// `{"op": "limit", "count": 10}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryOp {
    Filter {
        condition: Condition,
    },
    Project {
        fields: Vec<String>,
    },
    Order {
        fields: Vec<String>,
        #[serde(default)]
        direction: SortDirection,
    },
    /// Ranges are checked when the tree is compiled, not when it is built.
    Limit {
        count: i64,
        #[serde(default)]
        offset: i64,
    },
    Aggregate {
        function: String,
        field: String,
        #[serde(default)]
        group_by: Vec<String>,
    },
    Traverse {
        relationship: String,
        #[serde(default = "one")]
        depth: u32,
    },
    Include {
        relationship: String,
    },
}
