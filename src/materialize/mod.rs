pub mod handle;
pub mod instance;

pub use handle::DocumentHandle;
pub use instance::{Instance, Reference, Related};

use tracing::trace;

use crate::error::Error;
use crate::graph::GraphTopology;
use crate::schema::{Attributes, Cardinality, EntityType, SchemaRegistry, Value};

/// Maps raw backend documents onto entity instances.
pub struct Materializer<'a> {
    registry: &'a SchemaRegistry,
    topology: &'a GraphTopology,
}

impl<'a> Materializer<'a> {
    pub fn new(registry: &'a SchemaRegistry, topology: &'a GraphTopology) -> Self {
        Self { registry, topology }
    }

    pub fn materialize(
        &self,
        entity: &str,
        documents: &[serde_json::Value],
    ) -> Result<Vec<Instance>, Error> {
        let ty = self.registry.lookup(entity)?;
        documents.iter().map(|doc| self.document(ty, doc)).collect()
    }

    /// Picks each document's entity type from the collection in its `_id`.
    pub fn materialize_by_origin(
        &self,
        documents: &[serde_json::Value],
    ) -> Result<Vec<Instance>, Error> {
        documents.iter().map(|doc| self.by_origin(doc)).collect()
    }

    pub fn by_origin(&self, document: &serde_json::Value) -> Result<Instance, Error> {
        let handle = document
            .get("_id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| Error::malformed("?", "document has no `_id`"))?;
        let handle: DocumentHandle = handle
            .parse()
            .map_err(|_| Error::malformed("?", format!("bad `_id` `{}`", handle)))?;
        let ty = self
            .registry
            .by_collection(&handle.collection)
            .ok_or_else(|| Error::UnknownEntity(handle.collection.clone()))?;
        self.document(ty, document)
    }

    fn document(&self, ty: &EntityType, document: &serde_json::Value) -> Result<Instance, Error> {
        let entity = ty.name();
        let object = document
            .as_object()
            .ok_or_else(|| Error::malformed(entity, "document is not an object"))?;

        let key = object
            .get("_key")
            .and_then(|k| k.as_str())
            .ok_or_else(|| Error::malformed(entity, "missing `_key`"))?
            .to_string();

        if let Some(id) = object.get("_id") {
            let handle: DocumentHandle = id
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::malformed(entity, format!("bad `_id` {}", id)))?;
            if handle.collection != ty.collection_name() {
                return Err(Error::malformed(
                    entity,
                    format!(
                        "`_id` {} belongs to collection `{}`",
                        handle,
                        handle.collection
                    ),
                ));
            }
        }

        let mut attributes = Attributes::new();
        for attribute in ty.attributes() {
            let name = attribute.name();
            let value = match object.get(name) {
                Some(raw) => Value::from_json(attribute.field_type(), raw).ok_or_else(|| {
                    Error::malformed(
                        entity,
                        format!("`{}` is not a {}", name, attribute.field_type()),
                    )
                })?,
                None if attribute.is_nullable() => Value::Null,
                None => {
                    return Err(Error::malformed(
                        entity,
                        format!("missing attribute `{}`", name),
                    ));
                }
            };
            if value.is_null() && attribute.is_required() {
                return Err(Error::malformed(entity, format!("`{}` is null", name)));
            }
            attributes.insert(name.to_string(), value);
        }

        let mut relations = std::collections::BTreeMap::new();
        for name in self.topology.relation_names(entity) {
            let Some(raw) = object.get(name) else {
                continue;
            };
            let hop = self.topology.hop(entity, name)?;
            let parse = |raw: &serde_json::Value| -> Result<Reference, Error> {
                raw.as_str()
                    .and_then(|s| s.parse().ok())
                    .map(Reference::Pending)
                    .ok_or_else(|| {
                        Error::malformed(entity, format!("`{}` holds a bad handle {}", name, raw))
                    })
            };
            let related = match (hop.cardinality(), raw) {
                (_, serde_json::Value::Null) => continue,
                (Cardinality::One, raw) if !raw.is_array() => Related::One(parse(raw)?),
                (_, serde_json::Value::Array(items)) => Related::Many(
                    items
                        .iter()
                        .map(&parse)
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                (Cardinality::Many, raw) => Related::Many(vec![parse(raw)?]),
                (Cardinality::One, _) => continue,
            };
            relations.insert(name.to_string(), related);
        }

        trace!(entity, key = %key, "materialized document");
        Ok(Instance {
            entity: entity.to_string(),
            key: Some(key),
            attributes,
            relations,
        })
    }
}
