use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::entity::{RESERVED_NAMES, is_graph_name, is_identifier};
use super::{EntityDecl, EntityType};
use crate::{Catalog, Config, error::Error};

/// Holds every declared entity type. Filled during the registration phase,
/// then consumed by [`SchemaRegistry::resolve`].
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, EntityType>,
    // collection name -> entity name
    collections: BTreeMap<String, String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: EntityType) -> Result<(), Error> {
        if self.entities.contains_key(entity.name()) {
            return Err(Error::DuplicateEntity(entity.name().to_string()));
        }
        Self::validate(&entity)?;

        let collection = entity.collection_name();
        if self.collections.contains_key(&collection) {
            return Err(Error::CollectionNameCollision(collection));
        }

        debug!(
            entity = entity.name(),
            collection = %collection,
            attributes = entity.attributes().len(),
            relationships = entity.relationships().len(),
            "registered entity"
        );
        self.collections
            .insert(collection, entity.name().to_string());
        self.entities.insert(entity.name().to_string(), entity);
        Ok(())
    }

    pub fn register_entity<T: EntityDecl>(&mut self) -> Result<(), Error> {
        self.register(T::entity_type())
    }

    pub fn lookup(&self, name: &str) -> Result<&EntityType, Error> {
        self.entities
            .get(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    pub fn by_collection(&self, collection: &str) -> Option<&EntityType> {
        self.collections
            .get(collection)
            .and_then(|name| self.entities.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Entity types in name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.values()
    }

    pub(crate) fn collection_names(&self) -> impl Iterator<Item = &String> {
        self.collections.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ends the registration phase: resolves graph bindings and freezes the
    /// schema into a [`Catalog`].
    pub fn resolve(self) -> Result<Catalog, Error> {
        self.resolve_with(Config::default())
    }

    pub fn resolve_with(self, config: Config) -> Result<Catalog, Error> {
        Catalog::new(self, config)
    }

    fn validate(entity: &EntityType) -> Result<(), Error> {
        let name = entity.name();
        if !is_identifier(name) {
            return Err(Error::InvalidDeclaration(format!(
                "entity name `{}` is not a valid identifier",
                name
            )));
        }
        let collection = entity.collection_name();
        if !is_identifier(&collection) || collection.starts_with('_') {
            return Err(Error::InvalidDeclaration(format!(
                "collection `{}` of `{}` is not a valid collection name",
                collection, name
            )));
        }

        let mut seen = BTreeSet::new();
        for attribute in entity.attributes() {
            let attr = attribute.name();
            if !is_identifier(attr) || RESERVED_NAMES.contains(&attr) {
                return Err(Error::InvalidDeclaration(format!(
                    "attribute `{}.{}` is reserved or not a valid identifier",
                    name, attr
                )));
            }
            if !seen.insert(attr) {
                return Err(Error::InvalidDeclaration(format!(
                    "attribute `{}.{}` is declared twice",
                    name, attr
                )));
            }
            if let Some(default) = attribute.default() {
                if !attribute.field_type().accepts(default) {
                    return Err(Error::InvalidDeclaration(format!(
                        "default of `{}.{}` is not a {}",
                        name,
                        attr,
                        attribute.field_type()
                    )));
                }
            }
        }

        for relationship in entity.relationships() {
            let rel = relationship.name();
            if !is_identifier(rel) || RESERVED_NAMES.contains(&rel) {
                return Err(Error::InvalidDeclaration(format!(
                    "relationship `{}.{}` is reserved or not a valid identifier",
                    name, rel
                )));
            }
            if !seen.insert(rel) {
                return Err(Error::InvalidDeclaration(format!(
                    "relationship `{}.{}` clashes with another member",
                    name, rel
                )));
            }
            if !is_identifier(relationship.target()) {
                return Err(Error::InvalidDeclaration(format!(
                    "relationship `{}.{}` targets invalid name `{}`",
                    name,
                    rel,
                    relationship.target()
                )));
            }
            if let Some(graph) = relationship.graph_hint() {
                if !is_graph_name(graph) {
                    return Err(Error::InvalidDeclaration(format!(
                        "graph name `{}` on `{}.{}` is not valid",
                        graph, name, rel
                    )));
                }
            }
            if let Some(reverse) = relationship.reverse_name() {
                if !is_identifier(reverse) || RESERVED_NAMES.contains(&reverse) {
                    return Err(Error::InvalidDeclaration(format!(
                        "related name `{}` on `{}.{}` is reserved or not a valid identifier",
                        reverse, name, rel
                    )));
                }
            }
            if let Some(edges) = relationship.declared_edge_collection() {
                if !is_identifier(edges) || edges.starts_with('_') {
                    return Err(Error::InvalidDeclaration(format!(
                        "edge collection `{}` on `{}.{}` is not a valid collection name",
                        edges, name, rel
                    )));
                }
            }
        }
        Ok(())
    }
}
