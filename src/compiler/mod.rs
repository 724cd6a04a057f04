pub mod aggregate;
pub mod mutation;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::debug;

use crate::Config;
use crate::error::Error;
use crate::graph::GraphTopology;
use crate::query::{
    Aggregation, Comparison, FieldRef, Inclusion, Operand, Predicate, QueryNode, QueryTree, Scope,
    Traversal,
};
use crate::schema::{Cardinality, FieldType, ToValue, Value};

pub use aggregate::AggregateFunction;

const ROOT_VAR: &str = "doc";
const JOIN_VAR: &str = "hit";

/// AQL text plus its bind variables. `unbound` lists caller parameters that
/// still need a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    query: String,
    bind_vars: BTreeMap<String, serde_json::Value>,
    unbound: Vec<String>,
    #[serde(skip)]
    parameters: BTreeSet<String>,
}

impl CompiledQuery {
    pub(crate) fn statement(
        query: String,
        bind_vars: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            query,
            bind_vars,
            unbound: Vec::new(),
            parameters: BTreeSet::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn bind_vars(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.bind_vars
    }

    pub fn unbound(&self) -> &[String] {
        &self.unbound
    }

    /// Supplies a caller parameter; rebinding replaces the value.
    pub fn bind(&mut self, name: &str, value: impl ToValue) -> Result<(), Error> {
        if !self.parameters.contains(name) {
            return Err(Error::UnknownParameter(name.to_string()));
        }
        self.bind_vars
            .insert(name.to_string(), value.to_value().to_json());
        self.unbound.retain(|p| p != name);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.unbound.is_empty()
    }

    /// Cursor request body: `{"query": ..., "bindVars": {...}}`.
    pub fn request_body(&self) -> Result<serde_json::Value, Error> {
        if !self.is_ready() {
            return Err(Error::InvalidQuery(format!(
                "unbound parameters: {}",
                self.unbound.join(", ")
            )));
        }
        Ok(serde_json::json!({
            "query": self.query,
            "bindVars": self.bind_vars,
        }))
    }
}

/// Collects bind variables while a statement is rendered.
#[derive(Debug, Default)]
pub(crate) struct Binds {
    vars: BTreeMap<String, serde_json::Value>,
    literals: usize,
    parameters: BTreeSet<String>,
}

impl Binds {
    /// Binds a literal as the next `@litN`.
    pub(crate) fn literal(&mut self, value: &Value) -> String {
        self.json(value.to_json())
    }

    pub(crate) fn json(&mut self, value: serde_json::Value) -> String {
        let name = format!("lit{}", self.literals);
        self.literals += 1;
        self.vars.insert(name.clone(), value);
        format!("@{}", name)
    }

    pub(crate) fn named(&mut self, name: &str, value: serde_json::Value) -> String {
        self.vars.insert(name.to_string(), value);
        format!("@{}", name)
    }

    fn parameter(&mut self, name: &str) -> String {
        self.parameters.insert(name.to_string());
        format!("@{}", name)
    }

    pub(crate) fn finish(self, query: String) -> CompiledQuery {
        CompiledQuery {
            query,
            bind_vars: self.vars,
            unbound: self.parameters.iter().cloned().collect(),
            parameters: self.parameters,
        }
    }
}

/// Stateless translation of a [`QueryTree`] into one AQL statement.
pub struct Compiler<'a> {
    topology: &'a GraphTopology,
    config: &'a Config,
}

impl<'a> Compiler<'a> {
    pub fn new(topology: &'a GraphTopology, config: &'a Config) -> Self {
        Self { topology, config }
    }

    pub fn compile(&self, tree: &QueryTree) -> Result<CompiledQuery, Error> {
        let start = Instant::now();
        match self.render(tree) {
            Ok(compiled) => {
                histogram!("arangraph.compile.duration_us")
                    .record(start.elapsed().as_micros() as f64);
                debug!(
                    entity = tree.entity(),
                    query = %compiled.query,
                    binds = compiled.bind_vars.len(),
                    "compiled query"
                );
                Ok(compiled)
            }
            Err(err) => {
                counter!("arangraph.compile.errors", "kind" => err.kind().as_str()).increment(1);
                debug!(entity = tree.entity(), error = %err, "query compilation failed");
                Err(err)
            }
        }
    }

    fn render(&self, tree: &QueryTree) -> Result<CompiledQuery, Error> {
        let plan = Plan::check(tree)?;
        let joined = tree.has_traversal() && self.config.distinct_traversals;
        let columns = Columns::collect(tree, joined);
        let mut binds = Binds::default();
        let mut lines = vec![format!("FOR {} IN {}", ROOT_VAR, tree.collection())];

        match joined {
            true => self.render_join(tree, &columns, &mut binds, &mut lines)?,
            false => {
                for node in tree.nodes() {
                    match node {
                        QueryNode::Filter(predicate) => lines
                            .push(format!("FILTER {}", render_predicate(predicate, &mut binds))),
                        QueryNode::Traverse(traversal) => {
                            lines.push(self.render_traversal(traversal)?)
                        }
                        _ => {}
                    }
                }
            }
        }

        let mut includes: Vec<(&Inclusion, String)> = Vec::new();
        for node in tree.nodes() {
            if let QueryNode::Include(inclusion) = node {
                let var = format!("i{}", includes.len());
                lines.push(self.render_include(tree, inclusion, &var)?);
                includes.push((inclusion, var));
            }
        }

        let mut groups: Vec<&FieldRef> = Vec::new();
        if !plan.aggregates.is_empty() {
            groups = plan.aggregates[0].0.group_by.iter().collect();
            lines.push(render_collect(&plan.aggregates, &groups, &columns));
        }

        let mut sort: Vec<String> = Vec::new();
        for node in tree.nodes() {
            match node {
                QueryNode::Order { fields, direction } => {
                    for field in fields {
                        let expr = match plan.aggregates.is_empty() {
                            true => columns.expr(field),
                            false => group_var(&groups, field)?,
                        };
                        sort.push(format!("{} {}", expr, direction.as_aql()));
                    }
                }
                QueryNode::Limit { count, offset } => {
                    flush_sort(&mut lines, &mut sort);
                    lines.push(format!("LIMIT {}, {}", offset, count));
                }
                _ => {}
            }
        }
        flush_sort(&mut lines, &mut sort);

        let returned = if !plan.aggregates.is_empty() {
            let mut entries: Vec<String> = groups
                .iter()
                .enumerate()
                .map(|(i, g)| format!("{}: g{}", quote_key(&g.path), i))
                .collect();
            for (i, (aggregation, function)) in plan.aggregates.iter().enumerate() {
                let key = format!("{}__{}", aggregation.field.path, function.key());
                entries.push(format!("{}: a{}", quote_key(&key), i));
            }
            format!("RETURN {{ {} }}", entries.join(", "))
        } else if !plan.projection.is_empty() {
            let mut entries: Vec<String> = plan
                .projection
                .iter()
                .map(|f| format!("{}: {}", quote_key(&f.path), columns.expr(f)))
                .collect();
            entries.extend(
                includes
                    .iter()
                    .map(|(i, var)| format!("{}: {}", quote_key(&i.relationship), var)),
            );
            format!("RETURN {{ {} }}", entries.join(", "))
        } else if !includes.is_empty() {
            let entries: Vec<String> = includes
                .iter()
                .map(|(i, var)| format!("{}: {}", quote_key(&i.relationship), var))
                .collect();
            format!("RETURN MERGE({}, {{ {} }})", ROOT_VAR, entries.join(", "))
        } else {
            format!("RETURN {}", ROOT_VAR)
        };
        lines.push(returned);

        Ok(binds.finish(lines.join("\n")))
    }

    /// Renders every traversal and the filters that reach into it as one
    /// correlated subquery, so the outer loop keeps a single row per root
    /// document. Root-only filters stay on the outer loop. The subquery
    /// returns the first matching row, carrying the related values that
    /// sorting, projection and grouping need.
    fn render_join(
        &self,
        tree: &QueryTree,
        columns: &Columns,
        binds: &mut Binds,
        lines: &mut Vec<String>,
    ) -> Result<(), Error> {
        for node in tree.nodes() {
            if let QueryNode::Filter(predicate) = node {
                if root_only(predicate) {
                    lines.push(format!("FILTER {}", render_predicate(predicate, binds)));
                }
            }
        }

        let mut inner = Vec::new();
        for node in tree.nodes() {
            match node {
                QueryNode::Traverse(traversal) => inner.push(self.render_traversal(traversal)?),
                QueryNode::Filter(predicate) if !root_only(predicate) => {
                    inner.push(format!("FILTER {}", render_predicate(predicate, binds)))
                }
                _ => {}
            }
        }
        inner.push("LIMIT 1".to_string());
        inner.push(format!("RETURN {}", columns.row()));

        lines.push(format!("LET {} = FIRST(", JOIN_VAR));
        lines.extend(inner.into_iter().map(|line| format!("  {}", line)));
        lines.push(")".to_string());
        lines.push(format!("FILTER {} != null", JOIN_VAR));
        Ok(())
    }

    fn render_traversal(&self, traversal: &Traversal) -> Result<String, Error> {
        let hop = self
            .topology
            .hop(&traversal.source, &traversal.relationship)?;
        let collections = hop.edge_collections();
        let edges: Vec<String> = collections
            .iter()
            .enumerate()
            .map(|(i, (direction, collection))| match i {
                0 => collection.to_string(),
                _ => format!("{} {}", direction.as_aql(), collection),
            })
            .collect();
        let mut line = format!(
            "FOR t{} IN 1..{} {} {} {}",
            traversal.index,
            traversal.depth,
            hop.direction.as_aql(),
            scope_var(traversal.from),
            edges.join(", ")
        );
        if collections.len() > 1 || traversal.depth > 1 {
            line.push_str(r#" OPTIONS { order: "bfs", uniqueVertices: "global" }"#);
        }
        Ok(line)
    }

    fn render_include(
        &self,
        tree: &QueryTree,
        inclusion: &Inclusion,
        var: &str,
    ) -> Result<String, Error> {
        let hop = self.topology.hop(tree.entity(), &inclusion.relationship)?;
        let edges: Vec<String> = hop
            .edge_collections()
            .iter()
            .enumerate()
            .map(|(i, (direction, collection))| match i {
                0 => collection.to_string(),
                _ => format!("{} {}", direction.as_aql(), collection),
            })
            .collect();
        let subquery = format!(
            "FOR r{var} IN 1..1 {} {} {} RETURN DISTINCT r{var}._id",
            hop.direction.as_aql(),
            ROOT_VAR,
            edges.join(", "),
            var = var
        );
        Ok(match inclusion.cardinality {
            Cardinality::One => format!("LET {} = FIRST({})", var, subquery),
            Cardinality::Many => format!("LET {} = ({})", var, subquery),
        })
    }
}

/// Structural checks run before any output is produced.
struct Plan<'t> {
    projection: Vec<&'t FieldRef>,
    aggregates: Vec<(&'t Aggregation, AggregateFunction)>,
}

impl<'t> Plan<'t> {
    fn check(tree: &'t QueryTree) -> Result<Self, Error> {
        let mut plan = Plan {
            projection: Vec::new(),
            aggregates: Vec::new(),
        };
        let mut included = false;
        for node in tree.nodes() {
            match node {
                QueryNode::Limit { count, offset } => {
                    if *count <= 0 || *offset < 0 {
                        return Err(Error::InvalidLimit {
                            count: *count,
                            offset: *offset,
                        });
                    }
                }
                QueryNode::Aggregate(aggregation) => {
                    let function = aggregation.function.parse::<AggregateFunction>()?;
                    if let Some((first, _)) = plan.aggregates.first() {
                        let paths = |a: &Aggregation| {
                            a.group_by.iter().map(|g| g.path.clone()).collect::<Vec<_>>()
                        };
                        if paths(first) != paths(aggregation) {
                            return Err(Error::InvalidQuery(
                                "aggregates must share one group-by list".to_string(),
                            ));
                        }
                    }
                    plan.aggregates.push((aggregation, function));
                }
                QueryNode::Project(fields) => {
                    for field in fields {
                        if !plan.projection.iter().any(|f| f.path == field.path) {
                            plan.projection.push(field);
                        }
                    }
                }
                QueryNode::Include(_) => included = true,
                _ => {}
            }
        }
        if !plan.aggregates.is_empty() {
            if !plan.projection.is_empty() {
                return Err(Error::InvalidQuery(
                    "projection cannot be combined with an aggregate".to_string(),
                ));
            }
            if included {
                return Err(Error::InvalidQuery(
                    "include cannot be combined with an aggregate".to_string(),
                ));
            }
        }
        Ok(plan)
    }
}

/// Related values read after the join subquery, addressed as `hit.vN`.
#[derive(Debug, Default)]
struct Columns {
    exprs: Vec<String>,
}

impl Columns {
    fn collect(tree: &QueryTree, joined: bool) -> Self {
        let mut columns = Columns::default();
        if !joined {
            return columns;
        }
        for node in tree.nodes() {
            let fields: Vec<&FieldRef> = match node {
                QueryNode::Order { fields, .. } | QueryNode::Project(fields) => {
                    fields.iter().collect()
                }
                QueryNode::Aggregate(aggregation) => aggregation
                    .group_by
                    .iter()
                    .chain(std::iter::once(&aggregation.field))
                    .collect(),
                _ => Vec::new(),
            };
            for field in fields {
                if field.scope == Scope::Root {
                    continue;
                }
                let expr = field_expr(field);
                if !columns.exprs.contains(&expr) {
                    columns.exprs.push(expr);
                }
            }
        }
        columns
    }

    fn expr(&self, field: &FieldRef) -> String {
        let expr = field_expr(field);
        match self.exprs.iter().position(|e| *e == expr) {
            Some(i) => format!("{}.v{}", JOIN_VAR, i),
            None => expr,
        }
    }

    fn row(&self) -> String {
        if self.exprs.is_empty() {
            return "true".to_string();
        }
        let entries: Vec<String> = self
            .exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| format!("v{}: {}", i, expr))
            .collect();
        format!("{{ {} }}", entries.join(", "))
    }
}

fn flush_sort(lines: &mut Vec<String>, sort: &mut Vec<String>) {
    if !sort.is_empty() {
        lines.push(format!("SORT {}", sort.join(", ")));
        sort.clear();
    }
}

fn render_collect(
    aggregates: &[(&Aggregation, AggregateFunction)],
    groups: &[&FieldRef],
    columns: &Columns,
) -> String {
    let keys: Vec<String> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| format!("g{} = {}", i, columns.expr(g)))
        .collect();
    let values: Vec<String> = aggregates
        .iter()
        .enumerate()
        .map(|(i, (a, function))| format!("a{} = {}({})", i, function.as_aql(), columns.expr(&a.field)))
        .collect();
    match keys.is_empty() {
        true => format!("COLLECT AGGREGATE {}", values.join(", ")),
        false => format!("COLLECT {} AGGREGATE {}", keys.join(", "), values.join(", ")),
    }
}

fn group_var(groups: &[&FieldRef], field: &FieldRef) -> Result<String, Error> {
    groups
        .iter()
        .position(|g| g.path == field.path)
        .map(|i| format!("g{}", i))
        .ok_or_else(|| {
            Error::InvalidQuery(format!(
                "cannot order by `{}` after aggregating; only group-by fields remain",
                field.path
            ))
        })
}

fn render_predicate(predicate: &Predicate, binds: &mut Binds) -> String {
    match predicate {
        Predicate::Compare {
            field,
            comparison,
            operand,
        } => {
            let lhs = field_expr(field);
            let rhs = match operand {
                Operand::Literal(value) => binds.literal(value),
                Operand::Param { param } => binds.parameter(param),
            };
            match comparison {
                Comparison::Contains => match field.field_type {
                    Some(FieldType::String) => format!("CONTAINS({}, {})", lhs, rhs),
                    _ => format!("{} IN {}", rhs, lhs),
                },
                Comparison::StartsWith => format!("STARTS_WITH({}, {})", lhs, rhs),
                Comparison::In => format!("{} IN {}", lhs, rhs),
                other => format!("{} {} {}", lhs, other.as_aql().unwrap_or("=="), rhs),
            }
        }
        Predicate::IsNull { field, negated } => {
            let op = if *negated { "!=" } else { "==" };
            format!("{} {} null", field_expr(field), op)
        }
        Predicate::All(inner) => group(inner, " AND ", binds),
        Predicate::Any(inner) => group(inner, " OR ", binds),
        Predicate::Not(inner) => format!("NOT ({})", render_predicate(inner, binds)),
    }
}

fn root_only(predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare { field, .. } | Predicate::IsNull { field, .. } => {
            field.scope == Scope::Root
        }
        Predicate::All(inner) | Predicate::Any(inner) => inner.iter().all(root_only),
        Predicate::Not(inner) => root_only(inner),
    }
}

fn group(inner: &[Predicate], joiner: &str, binds: &mut Binds) -> String {
    let parts: Vec<String> = inner.iter().map(|p| render_predicate(p, binds)).collect();
    format!("({})", parts.join(joiner))
}

fn scope_var(scope: Scope) -> String {
    match scope {
        Scope::Root => ROOT_VAR.to_string(),
        Scope::Traversal(i) => format!("t{}", i),
    }
}

pub(crate) fn field_expr(field: &FieldRef) -> String {
    let var = scope_var(field.scope);
    match &field.attribute {
        None => var,
        Some(attribute) => {
            let mut expr = var;
            for segment in attribute.split('.') {
                expr.push('.');
                expr.push_str(&attribute_name(segment));
            }
            expr
        }
    }
}

const AQL_KEYWORDS: &[&str] = &[
    "aggregate", "all", "and", "any", "asc", "collect", "desc", "distinct", "false", "filter",
    "for", "graph", "in", "inbound", "insert", "into", "k_paths", "k_shortest_paths", "let",
    "like", "limit", "none", "not", "null", "or", "outbound", "remove", "replace", "return",
    "shortest_path", "sort", "true", "update", "upsert", "window", "with",
];

fn attribute_name(name: &str) -> String {
    match AQL_KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
        true => format!("`{}`", name),
        false => name.to_string(),
    }
}

fn quote_key(key: &str) -> String {
    serde_json::Value::String(key.to_string()).to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keyword_attributes_are_quoted() {
        assert_eq!(attribute_name("filter"), "`filter`");
        assert_eq!(attribute_name("title"), "title");
    }

    #[test]
    fn test_bind_unknown_parameter() {
        let mut binds = Binds::default();
        binds.parameter("title");
        let mut compiled = binds.finish("RETURN @title".to_string());
        assert!(!compiled.is_ready());
        assert_eq!(
            compiled.bind("other", "x"),
            Err(Error::UnknownParameter("other".to_string()))
        );
        compiled.bind("title", "Dune").unwrap();
        assert!(compiled.is_ready());
        assert_eq!(compiled.bind_vars()["title"], serde_json::json!("Dune"));
    }
}
