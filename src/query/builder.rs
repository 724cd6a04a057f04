use tracing::{debug, warn};

use super::op::{Condition, QueryOp};
use super::tree::{
    Aggregation, Comparison, FieldRef, Inclusion, Operand, Predicate, QueryNode, QueryTree, Scope,
    SortDirection, Traversal,
};
use crate::Catalog;
use crate::error::Error;
use crate::schema::{FieldType, KEY_FIELD, Value, is_identifier};

/// Bind-variable names the compiler reserves for literals: `lit0`, `lit1`, ...
pub(crate) fn is_literal_name(name: &str) -> bool {
    name.strip_prefix("lit")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Turns caller operations into a [`QueryTree`].
///
/// The first failing operation latches its error; later calls are ignored
/// and [`QueryBuilder::build`] returns that error.
///
/// ```rust,ignore
/// let tree = catalog
///     .query("Book")
///     .where_eq("author.name", "X")
///     .order_by("title")
///     .limit(10)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    catalog: Catalog,
    entity: String,
    collection: String,
    nodes: Vec<QueryNode>,
    // (from, relationship, depth) per traversal, indexed like `tN`
    traversals: Vec<(Scope, String, u32)>,
    error: Option<Error>,
}

impl QueryBuilder {
    pub(crate) fn new(catalog: Catalog, entity: &str) -> Self {
        let (collection, error) = match catalog.registry().lookup(entity) {
            Ok(ty) => (ty.collection_name(), None),
            Err(err) => (String::new(), Some(err)),
        };
        Self {
            catalog,
            entity: entity.to_string(),
            collection,
            nodes: Vec::new(),
            traversals: Vec::new(),
            error,
        }
    }

    fn step(self, f: impl FnOnce(&mut Self) -> Result<(), Error>) -> Self {
        let mut consumed_self = self;
        if consumed_self.error.is_none() {
            if let Err(err) = f(&mut consumed_self) {
                debug!(entity = %consumed_self.entity, error = %err, "query construction failed");
                consumed_self.error = Some(err);
            }
        }
        consumed_self
    }

    // ==================== Filters ====================

    pub fn filter(self, condition: Condition) -> Self {
        self.step(|b| {
            let predicate = b.predicate(&condition)?;
            b.nodes.push(QueryNode::Filter(predicate));
            Ok(())
        })
    }

    pub fn where_eq(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::eq(path, value))
    }

    pub fn where_ne(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::ne(path, value))
    }

    pub fn where_gt(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::gt(path, value))
    }

    pub fn where_gte(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::gte(path, value))
    }

    pub fn where_lt(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::lt(path, value))
    }

    pub fn where_lte(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::lte(path, value))
    }

    pub fn where_contains(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::contains(path, value))
    }

    pub fn where_starts_with(self, path: &str, value: impl Into<Operand>) -> Self {
        self.filter(Condition::starts_with(path, value))
    }

    pub fn where_in(self, path: &str, values: impl Into<Operand>) -> Self {
        self.filter(Condition::in_set(path, values))
    }

    pub fn where_null(self, path: &str) -> Self {
        self.filter(Condition::is_null(path))
    }

    pub fn where_not_null(self, path: &str) -> Self {
        self.filter(Condition::not_null(path))
    }

    /// OR group: matches when any condition holds.
    pub fn any_of(self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.filter(Condition::any(conditions))
    }

    // ==================== Shape ====================

    pub fn project<S: AsRef<str>>(self, fields: impl IntoIterator<Item = S>) -> Self {
        let fields: Vec<String> = fields.into_iter().map(|f| f.as_ref().to_string()).collect();
        self.step(|b| {
            let mut refs: Vec<FieldRef> = Vec::with_capacity(fields.len());
            for path in &fields {
                let field = b.resolve_path(path)?;
                if refs.iter().any(|r| r.path == field.path) {
                    warn!(path = %path, "duplicate projection field ignored");
                    continue;
                }
                refs.push(field);
            }
            if refs.is_empty() {
                return Err(Error::InvalidQuery("projection without fields".to_string()));
            }
            b.nodes.push(QueryNode::Project(refs));
            Ok(())
        })
    }

    pub fn order<S: AsRef<str>>(
        self,
        fields: impl IntoIterator<Item = S>,
        direction: SortDirection,
    ) -> Self {
        let fields: Vec<String> = fields.into_iter().map(|f| f.as_ref().to_string()).collect();
        self.step(|b| {
            if fields.is_empty() {
                return Err(Error::InvalidQuery("order without fields".to_string()));
            }
            let refs = fields
                .iter()
                .map(|path| b.scalar_path(path))
                .collect::<Result<Vec<_>, _>>()?;
            b.nodes.push(QueryNode::Order {
                fields: refs,
                direction,
            });
            Ok(())
        })
    }

    pub fn order_by(self, path: &str) -> Self {
        self.order([path], SortDirection::Ascending)
    }

    pub fn order_by_desc(self, path: &str) -> Self {
        self.order([path], SortDirection::Descending)
    }

    pub fn limit(self, count: i64) -> Self {
        self.limit_offset(count, 0)
    }

    /// Range checks happen at compile time.
    pub fn limit_offset(self, count: i64, offset: i64) -> Self {
        self.step(|b| {
            b.nodes.push(QueryNode::Limit { count, offset });
            Ok(())
        })
    }

    pub fn aggregate<S: AsRef<str>>(
        self,
        function: &str,
        field: &str,
        group_by: impl IntoIterator<Item = S>,
    ) -> Self {
        let group_by: Vec<String> = group_by
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        self.step(|b| {
            let field = b.scalar_path(field)?;
            let group_by = group_by
                .iter()
                .map(|path| b.scalar_path(path))
                .collect::<Result<Vec<_>, _>>()?;
            b.nodes.push(QueryNode::Aggregate(Aggregation {
                function: function.to_string(),
                field,
                group_by,
            }));
            Ok(())
        })
    }

    // ==================== Relationships ====================

    /// Follows `relationship` (dotted for nested hops) up to `depth` edges;
    /// the depth applies to the last hop.
    pub fn traverse(self, relationship: &str, depth: u32) -> Self {
        self.step(|b| {
            let segments: Vec<&str> = relationship.split('.').collect();
            let mut scope = Scope::Root;
            let mut entity = b.entity.clone();
            for (i, segment) in segments.iter().enumerate() {
                let requested = (i + 1 == segments.len()).then_some(depth);
                let (next, target) = b.ensure_traversal(scope, &entity, segment, requested)?;
                scope = next;
                entity = target;
            }
            Ok(())
        })
    }

    /// Loads related document handles into each returned root document.
    pub fn include(self, relationship: &str) -> Self {
        self.step(|b| {
            let hop = b.catalog.topology().hop(&b.entity, relationship)?;
            let duplicate = b.nodes.iter().any(
                |n| matches!(n, QueryNode::Include(i) if i.relationship == relationship),
            );
            if duplicate {
                warn!(relationship = %relationship, "relationship included twice");
                return Ok(());
            }
            b.nodes.push(QueryNode::Include(Inclusion {
                relationship: relationship.to_string(),
                target: hop.target().to_string(),
                direction: hop.direction,
                cardinality: hop.cardinality(),
            }));
            Ok(())
        })
    }

    // ==================== Operation lists ====================

    pub fn apply(self, op: QueryOp) -> Self {
        match op {
            QueryOp::Filter { condition } => self.filter(condition),
            QueryOp::Project { fields } => self.project(fields),
            QueryOp::Order { fields, direction } => self.order(fields, direction),
            QueryOp::Limit { count, offset } => self.limit_offset(count, offset),
            QueryOp::Aggregate {
                function,
                field,
                group_by,
            } => self.aggregate(&function, &field, group_by),
            QueryOp::Traverse {
                relationship,
                depth,
            } => self.traverse(&relationship, depth),
            QueryOp::Include { relationship } => self.include(&relationship),
        }
    }

    pub fn apply_all(self, ops: impl IntoIterator<Item = QueryOp>) -> Self {
        ops.into_iter().fold(self, QueryBuilder::apply)
    }

    pub fn build(self) -> Result<QueryTree, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(QueryTree {
            entity: self.entity,
            collection: self.collection,
            nodes: self.nodes,
        })
    }

    /* ---------------- resolution ---------------- */

    fn predicate(&mut self, condition: &Condition) -> Result<Predicate, Error> {
        match condition {
            Condition::Compare { path, op, value } => {
                let field = self.scalar_path(path)?;
                match value {
                    Operand::Param { param } => check_param_name(param)?,
                    Operand::Literal(literal) => check_literal(&field, *op, literal)?,
                }
                Ok(Predicate::Compare {
                    field,
                    comparison: *op,
                    operand: value.clone(),
                })
            }
            Condition::IsNull { path, negated } => Ok(Predicate::IsNull {
                field: self.scalar_path(path)?,
                negated: *negated,
            }),
            Condition::All { conditions } | Condition::Any { conditions } => {
                if conditions.is_empty() {
                    return Err(Error::InvalidQuery("empty condition group".to_string()));
                }
                let inner = conditions
                    .iter()
                    .map(|c| self.predicate(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match condition {
                    Condition::Any { .. } => Predicate::Any(inner),
                    _ => Predicate::All(inner),
                })
            }
            Condition::Not { condition } => Ok(Predicate::Not(Box::new(self.predicate(condition)?))),
        }
    }

    /// A path that must end on a document attribute.
    fn scalar_path(&mut self, path: &str) -> Result<FieldRef, Error> {
        let field = self.resolve_path(path)?;
        if field.is_document() {
            return Err(Error::InvalidQuery(format!(
                "`{}` names a relationship, not an attribute",
                path
            )));
        }
        Ok(field)
    }

    /// Resolves a dotted path, inserting (or reusing) a traversal for every
    /// relationship segment it crosses.
    fn resolve_path(&mut self, path: &str) -> Result<FieldRef, Error> {
        let unknown = |entity: &str| Error::UnknownField {
            entity: entity.to_string(),
            path: path.to_string(),
        };
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(unknown(&self.entity));
        }

        let mut scope = Scope::Root;
        let mut entity = self.entity.clone();
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let field = |attribute: String, field_type: FieldType| FieldRef {
                path: path.to_string(),
                scope,
                entity: entity.clone(),
                attribute: Some(attribute),
                field_type: Some(field_type),
            };

            if *segment == KEY_FIELD {
                return match last {
                    true => Ok(field("_key".to_string(), FieldType::String)),
                    false => Err(unknown(&entity)),
                };
            }

            let ty = self.catalog.registry().lookup(&entity)?;
            if let Some(attribute) = ty.get_attribute(segment) {
                if last {
                    return Ok(field(segment.to_string(), attribute.field_type()));
                }
                // nested keys inside a JSON attribute
                let rest = &segments[i + 1..];
                if attribute.field_type() == FieldType::Json && rest.iter().all(|s| is_identifier(s)) {
                    return Ok(field(segments[i..].join("."), FieldType::Json));
                }
                return Err(unknown(&entity));
            }

            let topology = self.catalog.topology();
            if last && topology.hop(&entity, segment).is_err() {
                return Err(unknown(&entity));
            }
            let (next, target) = self.ensure_traversal(scope, &entity, segment, None)?;
            scope = next;
            entity = target;
        }

        Ok(FieldRef {
            path: path.to_string(),
            scope,
            entity,
            attribute: None,
            field_type: None,
        })
    }

    /// Returns the scope and entity reached by `relationship` from `from`,
    /// adding a `Traverse` node unless this query already has one.
    fn ensure_traversal(
        &mut self,
        from: Scope,
        source: &str,
        relationship: &str,
        depth: Option<u32>,
    ) -> Result<(Scope, String), Error> {
        let hop = self.catalog.topology().hop(source, relationship)?;
        let target = hop.target().to_string();
        let direction = hop.direction;

        if let Some(index) = self
            .traversals
            .iter()
            .position(|(f, r, _)| *f == from && r == relationship)
        {
            let existing = self.traversals[index].2;
            if let Some(requested) = depth {
                if requested != existing {
                    return Err(Error::InvalidQuery(format!(
                        "`{}` is already traversed with depth {}, not {}",
                        relationship, existing, requested
                    )));
                }
            }
            return Ok((Scope::Traversal(index), target));
        }

        let depth = depth.unwrap_or(1);
        if depth == 0 {
            return Err(Error::InvalidQuery(format!(
                "traversal of `{}` needs a depth of at least 1",
                relationship
            )));
        }
        let max = self.catalog.config().max_traversal_depth;
        if depth > max {
            return Err(Error::TraversalDepthExceeded {
                requested: depth,
                max,
            });
        }

        let index = self.traversals.len();
        self.traversals
            .push((from, relationship.to_string(), depth));
        self.nodes.push(QueryNode::Traverse(Traversal {
            index,
            from,
            source: source.to_string(),
            relationship: relationship.to_string(),
            target: target.clone(),
            direction,
            depth,
        }));
        Ok((Scope::Traversal(index), target))
    }
}

fn check_param_name(name: &str) -> Result<(), Error> {
    if !is_identifier(name) || is_literal_name(name) {
        return Err(Error::InvalidQuery(format!(
            "`{}` is not a usable parameter name",
            name
        )));
    }
    Ok(())
}

fn check_literal(field: &FieldRef, comparison: Comparison, literal: &Value) -> Result<(), Error> {
    let Some(expected) = field.field_type else {
        return Ok(());
    };
    let ok = match comparison {
        Comparison::In => match literal {
            Value::List(items) => items.iter().all(|v| expected.accepts(v)),
            Value::Json(serde_json::Value::Array(_)) => true,
            _ => false,
        },
        Comparison::Contains => match expected {
            FieldType::String => matches!(literal, Value::String(_)),
            FieldType::Json => true,
            _ => false,
        },
        Comparison::StartsWith => {
            expected == FieldType::String && matches!(literal, Value::String(_))
        }
        _ => expected.accepts(literal),
    };
    match ok {
        true => Ok(()),
        false => Err(Error::TypeMismatch {
            field: field.path.clone(),
            expected,
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_literal_names() {
        assert!(is_literal_name("lit0"));
        assert!(is_literal_name("lit12"));
        assert!(!is_literal_name("lit"));
        assert!(!is_literal_name("literal"));
        assert!(!is_literal_name("title"));
    }
}
