use tracing::debug;
use uuid::Uuid;

use super::{Binds, CompiledQuery};
use crate::error::Error;
use crate::graph::{Direction, GraphTopology, Hop};
use crate::materialize::{DocumentHandle, Instance, Reference, Related};
use crate::schema::{Cardinality, EntityType, FieldType, SchemaRegistry, Value};

/// Compiles document and edge writes. Each operation yields statements to be
/// run in order.
pub struct Mutations<'a> {
    registry: &'a SchemaRegistry,
    topology: &'a GraphTopology,
}

impl<'a> Mutations<'a> {
    pub fn new(registry: &'a SchemaRegistry, topology: &'a GraphTopology) -> Self {
        Self { registry, topology }
    }

    /* ---------------- documents ---------------- */

    /// Inserts the document (defaults applied, key generated when absent)
    /// followed by one edge insert per assigned reference.
    pub fn insert(&self, instance: &Instance) -> Result<Vec<CompiledQuery>, Error> {
        let ty = self.registry.lookup(&instance.entity)?;
        self.check_known_attributes(ty, instance)?;

        let key = match &instance.key {
            Some(key) => key.clone(),
            None => Uuid::now_v7().to_string(),
        };
        let mut document = serde_json::Map::new();
        document.insert("_key".to_string(), serde_json::Value::String(key.clone()));
        for attribute in ty.attributes() {
            let name = attribute.name();
            let value = match (instance.get(name), attribute.default()) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) if attribute.is_nullable() => Value::Null,
                (None, None) => {
                    return Err(Error::InvalidQuery(format!(
                        "`{}.{}` is required",
                        ty.name(),
                        name
                    )));
                }
            };
            Self::check_value(ty, name, attribute.is_required(), attribute.field_type(), &value)?;
            document.insert(name.to_string(), value.to_json());
        }

        let mut binds = Binds::default();
        let doc = binds.named("doc", serde_json::Value::Object(document));
        let mut statements = vec![binds.finish(format!(
            "INSERT {} INTO {} RETURN NEW",
            doc,
            ty.collection_name()
        ))];

        let source = DocumentHandle::new(ty.collection_name(), key);
        for (relationship, related) in &instance.relations {
            let targets = self.targets(related)?;
            statements.extend(self.assign_edges(&source, relationship, &targets, false)?);
        }
        debug!(entity = ty.name(), handle = %source, statements = statements.len(), "compiled insert");
        Ok(statements)
    }

    /// Patches the given attributes and replaces the edges of every assigned
    /// relationship.
    pub fn update(&self, instance: &Instance) -> Result<Vec<CompiledQuery>, Error> {
        let ty = self.registry.lookup(&instance.entity)?;
        let key = instance
            .key()
            .ok_or_else(|| Error::InvalidQuery(format!("update of `{}` without a key", ty.name())))?;
        self.check_known_attributes(ty, instance)?;

        let mut patch = serde_json::Map::new();
        for (name, value) in &instance.attributes {
            if let Some(attribute) = ty.get_attribute(name) {
                Self::check_value(ty, name, attribute.is_required(), attribute.field_type(), value)?;
                patch.insert(name.clone(), value.to_json());
            }
        }

        let mut binds = Binds::default();
        let key_var = binds.named("key", serde_json::Value::String(key.to_string()));
        let patch_var = binds.named("patch", serde_json::Value::Object(patch));
        let mut statements = vec![binds.finish(format!(
            "UPDATE {} WITH {} IN {} RETURN NEW",
            key_var,
            patch_var,
            ty.collection_name()
        ))];

        let source = DocumentHandle::new(ty.collection_name(), key);
        for (relationship, related) in &instance.relations {
            let targets = self.targets(related)?;
            statements.extend(self.assign_edges(&source, relationship, &targets, true)?);
        }
        debug!(entity = ty.name(), handle = %source, statements = statements.len(), "compiled update");
        Ok(statements)
    }

    /// Removes edge records leaving and entering the document, then the
    /// document itself.
    pub fn remove(&self, entity: &str, key: &str) -> Result<Vec<CompiledQuery>, Error> {
        let ty = self.registry.lookup(entity)?;
        let handle = DocumentHandle::new(ty.collection_name(), key);

        let mut statements = Vec::new();
        let sweeps = self
            .topology
            .outgoing(ty.name())
            .map(|link| (link, "_from"))
            .chain(self.topology.incoming(ty.name()).map(|link| (link, "_to")));
        for (link, side) in sweeps {
            let mut binds = Binds::default();
            let var = binds.named("handle", serde_json::Value::String(handle.to_string()));
            statements.push(binds.finish(format!(
                "FOR e IN {c} FILTER e.{side} == {var} REMOVE e IN {c}",
                c = link.collection,
                side = side,
                var = var
            )));
        }

        let mut binds = Binds::default();
        let key_var = binds.named("key", serde_json::Value::String(key.to_string()));
        statements.push(binds.finish(format!(
            "REMOVE {} IN {}",
            key_var,
            ty.collection_name()
        )));
        debug!(entity = ty.name(), handle = %handle, statements = statements.len(), "compiled remove");
        Ok(statements)
    }

    pub fn document(&self, handle: &DocumentHandle) -> Result<CompiledQuery, Error> {
        if self.registry.by_collection(&handle.collection).is_none() {
            return Err(Error::UnknownEntity(handle.collection.clone()));
        }
        let mut binds = Binds::default();
        let var = binds.json(serde_json::Value::String(handle.to_string()));
        Ok(binds.finish(format!("RETURN DOCUMENT({})", var)))
    }

    /* ---------------- edges ---------------- */

    /// Connects `source` to `target`. A single-valued side loses its
    /// current edge first, on either end of the relationship.
    pub fn link(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        target: &DocumentHandle,
    ) -> Result<Vec<CompiledQuery>, Error> {
        let hop = self.hop(source, relationship)?;
        Self::check_target(&hop, relationship, target)?;
        let mut statements = Vec::new();
        if hop.cardinality() == Cardinality::One {
            statements.extend(Self::sweep(&hop, source, None));
        }
        statements.extend(self.connect(&hop, source, target)?);
        Ok(statements)
    }

    /// Removes the edge to `target`, or every edge of the relationship when
    /// `target` is `None`. Bidirectional bindings are swept in both edge
    /// collections.
    pub fn unlink(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        target: Option<&DocumentHandle>,
    ) -> Result<Vec<CompiledQuery>, Error> {
        let hop = self.hop(source, relationship)?;
        if let Some(target) = target {
            Self::check_target(&hop, relationship, target)?;
        }
        Ok(Self::sweep(&hop, source, target))
    }

    /// Replaces every edge of the relationship with edges to `targets`.
    pub fn assign(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        targets: &[DocumentHandle],
    ) -> Result<Vec<CompiledQuery>, Error> {
        self.assign_edges(source, relationship, targets, true)
    }

    fn assign_edges(
        &self,
        source: &DocumentHandle,
        relationship: &str,
        targets: &[DocumentHandle],
        clear: bool,
    ) -> Result<Vec<CompiledQuery>, Error> {
        let hop = self.hop(source, relationship)?;
        if hop.cardinality() == Cardinality::One && targets.len() > 1 {
            return Err(Error::InvalidQuery(format!(
                "`{}` holds a single document, got {}",
                relationship,
                targets.len()
            )));
        }
        let mut statements = Vec::with_capacity(targets.len() + 2);
        if clear {
            statements.extend(Self::sweep(&hop, source, None));
        }
        for target in targets {
            Self::check_target(&hop, relationship, target)?;
            statements.extend(self.connect(&hop, source, target)?);
        }
        Ok(statements)
    }

    /// Inserts the edge, clearing `target`'s own edge first when `target`
    /// sees the relationship as single-valued.
    fn connect(
        &self,
        hop: &Hop<'a>,
        source: &DocumentHandle,
        target: &DocumentHandle,
    ) -> Result<Vec<CompiledQuery>, Error> {
        let mut statements = Vec::new();
        if let Some(back) = self.back(hop)? {
            if back.cardinality() == Cardinality::One {
                statements.extend(Self::sweep(&back, target, None));
            }
        }

        let (from, to) = match hop.direction {
            Direction::Outbound => (source, target),
            Direction::Inbound => (target, source),
        };
        let mut binds = Binds::default();
        let from = binds.named("from", serde_json::Value::String(from.to_string()));
        let to = binds.named("to", serde_json::Value::String(to.to_string()));
        statements.push(binds.finish(format!(
            "INSERT {{ _from: {}, _to: {} }} INTO {} RETURN NEW",
            from, to, hop.link.collection
        )));
        Ok(statements)
    }

    /// The relationship as declared from the target's side: the declaration
    /// behind a reverse accessor, or the partner of a bidirectional binding.
    fn back(&self, hop: &Hop<'a>) -> Result<Option<Hop<'a>>, Error> {
        let link = match hop.direction {
            Direction::Inbound => Some(hop.link),
            Direction::Outbound => hop.partner(),
        };
        link.map(|l| self.topology.hop(&l.source, &l.relationship))
            .transpose()
    }

    /// One `REMOVE` per edge collection the hop reads, matching `handle` on
    /// its own side of each collection.
    fn sweep(
        hop: &Hop<'_>,
        handle: &DocumentHandle,
        target: Option<&DocumentHandle>,
    ) -> Vec<CompiledQuery> {
        hop.edge_collections()
            .into_iter()
            .map(|(direction, collection)| {
                let (own, other) = match direction {
                    Direction::Outbound => ("_from", "_to"),
                    Direction::Inbound => ("_to", "_from"),
                };
                let mut binds = Binds::default();
                let source_var = binds.named("source", serde_json::Value::String(handle.to_string()));
                let mut filter = format!("e.{} == {}", own, source_var);
                if let Some(target) = target {
                    let target_var =
                        binds.named("target", serde_json::Value::String(target.to_string()));
                    filter.push_str(&format!(" AND e.{} == {}", other, target_var));
                }
                binds.finish(format!(
                    "FOR e IN {c} FILTER {filter} REMOVE e IN {c}",
                    c = collection,
                    filter = filter
                ))
            })
            .collect()
    }

    /* ---------------- checks ---------------- */

    fn hop(&self, source: &DocumentHandle, relationship: &str) -> Result<Hop<'a>, Error> {
        let ty = self
            .registry
            .by_collection(&source.collection)
            .ok_or_else(|| Error::UnknownEntity(source.collection.clone()))?;
        self.topology.hop(ty.name(), relationship)
    }

    fn check_target(hop: &Hop<'_>, relationship: &str, target: &DocumentHandle) -> Result<(), Error> {
        let expected = match hop.direction {
            Direction::Outbound => &hop.link.to_collection,
            Direction::Inbound => &hop.link.from_collection,
        };
        if &target.collection != expected {
            return Err(Error::InvalidQuery(format!(
                "`{}` points into `{}`, not `{}`",
                relationship, expected, target.collection
            )));
        }
        Ok(())
    }

    fn targets(&self, related: &Related) -> Result<Vec<DocumentHandle>, Error> {
        related
            .references()
            .iter()
            .map(|reference| match reference {
                Reference::Pending(handle) => Ok(handle.clone()),
                Reference::Resolved(instance) => {
                    let ty = self.registry.lookup(&instance.entity)?;
                    let key = instance.key().ok_or_else(|| {
                        Error::InvalidQuery(format!(
                            "related `{}` has no key; insert it first",
                            instance.entity
                        ))
                    })?;
                    Ok(DocumentHandle::new(ty.collection_name(), key))
                }
            })
            .collect()
    }

    fn check_known_attributes(&self, ty: &EntityType, instance: &Instance) -> Result<(), Error> {
        match instance
            .attributes
            .keys()
            .find(|name| ty.get_attribute(name).is_none())
        {
            Some(name) => Err(Error::UnknownField {
                entity: ty.name().to_string(),
                path: name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_value(
        ty: &EntityType,
        name: &str,
        required: bool,
        field_type: FieldType,
        value: &Value,
    ) -> Result<(), Error> {
        if value.is_null() && required {
            return Err(Error::InvalidQuery(format!(
                "`{}.{}` is required",
                ty.name(),
                name
            )));
        }
        if !field_type.accepts(value) {
            return Err(Error::TypeMismatch {
                field: name.to_string(),
                expected: field_type,
            });
        }
        Ok(())
    }
}
