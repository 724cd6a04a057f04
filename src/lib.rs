//! # Arangraph
//!
//! Arangraph lets an application describe its data with a relational-style
//! object model (entity types with typed attributes, filters, ordering,
//! aggregation and relationships) and run it against ArangoDB. Queries are
//! compiled to AQL; relationships are stored as edges in named graphs.
//!
//! ## What's inside
//!
//! ### Schema registry
//! Entity types are declared once, through the builder API or
//! `#[derive(Entity)]`, then frozen. Relationship targets may be declared
//! before the target type is registered.
//!
//! ### Graph resolution
//! Every relationship resolves to a named graph. Two declarations naming
//! each other with the same graph hint form one bidirectional binding;
//! unhinted declarations get a synthesized, stable graph name
//! (`graph_<target>_<source>`).
//!
//! ### Query compilation
//! Operations build a query tree which compiles to a single AQL statement.
//! Paths crossing a relationship (`author.name`) become graph traversals.
//! Literals are always sent as bind variables.
//!
//! ```rust,ignore
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     EntityType::new("Author").attribute(Attribute::new("name", FieldType::String)),
//! )?;
//! registry.register(
//!     EntityType::new("Book")
//!         .attribute(Attribute::new("title", FieldType::String))
//!         .relationship(Relationship::new("author", "Author")),
//! )?;
//! let catalog = registry.resolve()?;
//!
//! let tree = catalog.query("Book").where_eq("author.name", "X").build()?;
//! let compiled = catalog.compile(&tree)?;
//! // FOR doc IN book
//! // LET hit = FIRST(
//! //   FOR t0 IN 1..1 OUTBOUND doc book_author
//! //   FILTER t0.name == @lit0
//! //   LIMIT 1
//! //   RETURN true
//! // )
//! // FILTER hit != null
//! // RETURN doc
//! ```
//!
//! ### Materialization
//! Result documents map back onto [`Instance`]s. Related documents stay
//! [`Reference::Pending`] until explicitly resolved through a [`Transport`].
//!
//! ## Phases
//!
//! A mutable [`SchemaRegistry`] is consumed by [`SchemaRegistry::resolve`],
//! producing an immutable, cheaply cloneable [`Catalog`]. Only a catalog
//! builds and compiles queries.
//!

pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod materialize;
pub mod query;
pub mod schema;
pub mod transport;

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::debug;

pub use crate::compiler::{AggregateFunction, CompiledQuery, Compiler, mutation::Mutations};
pub use crate::config::Config;
pub use crate::error::{Error, ErrorKind};
pub use crate::graph::{
    Direction, EdgeDefinition, ExistingSchema, GRAPH_NAMING_VERSION, GraphBinding,
    GraphDefinition, GraphNameOrigin, GraphTopology, SchemaAction,
};
pub use crate::materialize::{DocumentHandle, Instance, Materializer, Reference, Related};
pub use crate::query::{
    Comparison, Condition, Operand, QueryBuilder, QueryNode, QueryOp, QueryTree, SortDirection,
};
pub use crate::schema::{
    Attribute, Attributes, Cardinality, EntityDecl, EntityType, FieldKind, FieldType,
    Relationship, SchemaRegistry, ToValue, Value,
};
pub use crate::transport::Transport;

#[cfg(feature = "derive")]
pub use arangraph_derive::*;

/// The resolved, read-only schema: entity types, graph bindings and
/// configuration. Clones share one allocation.
#[derive(Debug, Clone)]
pub struct Catalog {
    inner: Arc<Arangraph>,
}

#[derive(Debug)]
struct Arangraph {
    registry: SchemaRegistry,
    topology: GraphTopology,
    config: Config,
}

impl Catalog {
    pub(crate) fn new(registry: SchemaRegistry, config: Config) -> Result<Self, Error> {
        let topology = graph::GraphResolver::resolve(&registry)?;
        debug!(
            entities = registry.len(),
            bindings = topology.len(),
            max_traversal_depth = config.max_traversal_depth,
            "catalog resolved"
        );
        Ok(Self {
            inner: Arc::new(Arangraph {
                registry,
                topology,
                config,
            }),
        })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    pub fn topology(&self) -> &GraphTopology {
        &self.inner.topology
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn entity(&self, name: &str) -> Result<&EntityType, Error> {
        self.inner.registry.lookup(name)
    }

    /// Binding of a relationship declared on `source`.
    pub fn binding(&self, source: &str, relationship: &str) -> Result<&GraphBinding, Error> {
        self.inner.topology.binding(source, relationship)
    }

    // ==================== Queries ====================

    pub fn query(&self, entity: &str) -> QueryBuilder {
        QueryBuilder::new(self.clone(), entity)
    }

    pub fn query_for<T: EntityDecl>(&self) -> QueryBuilder {
        self.query(T::TYPE)
    }

    /// Builds a tree from a JSON-style operation list.
    ///
    /// Only names and types are checked here. Limit ranges are validated by
    /// [`Catalog::compile`], so a tree built from `{"op": "limit", "count": 0}`
    /// is accepted and then rejected with [`Error::InvalidLimit`].
    pub fn build(&self, entity: &str, ops: Vec<QueryOp>) -> Result<QueryTree, Error> {
        self.query(entity).apply_all(ops).build()
    }

    pub fn compile(&self, tree: &QueryTree) -> Result<CompiledQuery, Error> {
        Compiler::new(&self.inner.topology, &self.inner.config).compile(tree)
    }

    // ==================== Mutations ====================

    fn mutations(&self) -> Mutations<'_> {
        Mutations::new(&self.inner.registry, &self.inner.topology)
    }

    pub fn compile_insert(&self, instance: &Instance) -> Result<Vec<CompiledQuery>, Error> {
        self.mutations().insert(instance)
    }

    pub fn compile_update(&self, instance: &Instance) -> Result<Vec<CompiledQuery>, Error> {
        self.mutations().update(instance)
    }

    pub fn compile_remove(&self, entity: &str, key: &str) -> Result<Vec<CompiledQuery>, Error> {
        self.mutations().remove(entity, key)
    }

    pub fn compile_link(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        target: &DocumentHandle,
    ) -> Result<Vec<CompiledQuery>, Error> {
        self.mutations().link(source, relationship, target)
    }

    pub fn compile_unlink(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        target: Option<&DocumentHandle>,
    ) -> Result<Vec<CompiledQuery>, Error> {
        self.mutations().unlink(source, relationship, target)
    }

    pub fn compile_assign(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        targets: &[DocumentHandle],
    ) -> Result<Vec<CompiledQuery>, Error> {
        self.mutations().assign(source, relationship, targets)
    }

    pub fn compile_document(&self, handle: &DocumentHandle) -> Result<CompiledQuery, Error> {
        self.mutations().document(handle)
    }

    /// Handle of a stored instance.
    pub fn handle_of(&self, instance: &Instance) -> Result<DocumentHandle, Error> {
        let ty = self.entity(&instance.entity)?;
        let key = instance
            .key()
            .ok_or_else(|| Error::InvalidQuery(format!("`{}` instance has no key", ty.name())))?;
        Ok(DocumentHandle::new(ty.collection_name(), key))
    }

    // ==================== Results ====================

    fn materializer(&self) -> Materializer<'_> {
        Materializer::new(&self.inner.registry, &self.inner.topology)
    }

    pub fn materialize(
        &self,
        entity: &str,
        documents: &[serde_json::Value],
    ) -> Result<Vec<Instance>, Error> {
        self.materializer().materialize(entity, documents)
    }

    pub fn materialize_by_origin(
        &self,
        documents: &[serde_json::Value],
    ) -> Result<Vec<Instance>, Error> {
        self.materializer().materialize_by_origin(documents)
    }

    pub fn materialize_document(&self, document: &serde_json::Value) -> Result<Instance, Error> {
        self.materializer().by_origin(document)
    }

    /// Runs a ready statement. Unbound parameters fail before the transport
    /// is called.
    pub async fn execute(
        &self,
        compiled: &CompiledQuery,
        transport: &dyn Transport,
    ) -> Result<Vec<serde_json::Value>, Error> {
        if !compiled.is_ready() {
            return Err(Error::InvalidQuery(format!(
                "unbound parameters: {}",
                compiled.unbound().join(", ")
            )));
        }
        let start = Instant::now();
        let rows = transport.execute(compiled).await?;
        histogram!("arangraph.fetch.duration_ms").record(start.elapsed().as_millis() as f64);
        Ok(rows)
    }

    /// Compiles, executes and materializes a document query. Trees that
    /// project or aggregate return rows, not documents; run those through
    /// [`Catalog::execute`].
    pub async fn fetch(
        &self,
        tree: &QueryTree,
        transport: &dyn Transport,
    ) -> Result<Vec<Instance>, Error> {
        if !tree.returns_documents() {
            return Err(Error::InvalidQuery(
                "fetch needs whole documents; use execute for projections and aggregates"
                    .to_string(),
            ));
        }
        let compiled = self.compile(tree)?;
        let rows = self.execute(&compiled, transport).await?;
        debug!(entity = tree.entity(), rows = rows.len(), "fetched documents");
        self.materialize(tree.entity(), &rows)
    }

    // ==================== Schema ====================

    pub fn graph_definitions(&self) -> Vec<GraphDefinition> {
        graph::definition::graph_definitions(&self.inner.topology)
    }

    pub fn plan_schema(&self, existing: &ExistingSchema) -> Result<Vec<SchemaAction>, Error> {
        graph::definition::plan_schema(&self.inner.registry, &self.inner.topology, existing)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn catalog() -> Catalog {
        let mut registry = SchemaRegistry::new();
        registry
            .register(EntityType::new("Author").attribute(Attribute::new("name", FieldType::String)))
            .unwrap();
        registry
            .register(
                EntityType::new("Book")
                    .attribute(Attribute::new("title", FieldType::String))
                    .relationship(Relationship::new("author", "Author").related_name("books")),
            )
            .unwrap();
        registry.resolve().unwrap()
    }

    #[test]
    fn test_catalog_clones_share_state() {
        let catalog = catalog();
        let other = catalog.clone();
        assert!(Arc::ptr_eq(&catalog.inner, &other.inner));
    }

    #[test]
    fn test_plain_query_has_no_traversal() {
        let catalog = catalog();
        let tree = catalog.query("Book").where_eq("title", "Dune").build().unwrap();
        let compiled = catalog.compile(&tree).unwrap();
        assert_eq!(
            compiled.query(),
            "FOR doc IN book\nFILTER doc.title == @lit0\nRETURN doc"
        );
        assert!(!compiled.query().contains("OUTBOUND"));
    }

    #[test]
    fn test_reverse_accessor_traverses_inbound() {
        let catalog = catalog();
        let tree = catalog
            .query("Author")
            .where_eq("books.title", "Dune")
            .build()
            .unwrap();
        let compiled = catalog.compile(&tree).unwrap();
        assert!(compiled.query().contains("FOR t0 IN 1..1 INBOUND doc book_author"));
    }
}
