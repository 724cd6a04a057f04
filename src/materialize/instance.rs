use std::collections::BTreeMap;

use super::DocumentHandle;
use crate::error::Error;
use crate::schema::{Attributes, ToValue, Value};
use crate::transport::Transport;
use crate::Catalog;

/// A related document: only its handle until resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Pending(DocumentHandle),
    Resolved(Box<Instance>),
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    pub fn get(&self) -> Option<&Instance> {
        match self {
            Reference::Resolved(instance) => Some(&**instance),
            Reference::Pending(_) => None,
        }
    }

    /// Handle of the pending document; `None` once resolved.
    pub fn pending(&self) -> Option<&DocumentHandle> {
        match self {
            Reference::Pending(handle) => Some(handle),
            Reference::Resolved(_) => None,
        }
    }

    /// Fetches the referenced document if still pending. A document that no
    /// longer exists fails with [`Error::NotFound`].
    pub async fn resolve(
        &mut self,
        catalog: &Catalog,
        transport: &dyn Transport,
    ) -> Result<&Instance, Error> {
        if let Reference::Pending(handle) = self {
            let compiled = catalog.compile_document(handle)?;
            let rows = transport.execute(&compiled).await?;
            let document = rows
                .into_iter()
                .next()
                .filter(|doc| !doc.is_null())
                .ok_or(Error::NotFound)?;
            let instance = catalog.materialize_document(&document)?;
            *self = Reference::Resolved(Box::new(instance));
        }
        match self {
            Reference::Resolved(instance) => Ok(&**instance),
            Reference::Pending(_) => Err(Error::NotFound),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Reference),
    Many(Vec<Reference>),
}

impl Related {
    pub fn references(&self) -> &[Reference] {
        match self {
            Related::One(reference) => std::slice::from_ref(reference),
            Related::Many(references) => references,
        }
    }

    pub fn references_mut(&mut self) -> &mut [Reference] {
        match self {
            Related::One(reference) => std::slice::from_mut(reference),
            Related::Many(references) => references,
        }
    }
}

/// A document mapped onto an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub entity: String,
    /// `_key`; generated on insert when absent.
    pub key: Option<String>,
    pub attributes: Attributes,
    pub relations: BTreeMap<String, Related>,
}

impl Instance {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            key: None,
            attributes: Attributes::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn set(mut self, name: &str, value: impl ToValue) -> Self {
        self.attributes.insert(name.to_string(), value.to_value());
        self
    }

    /// Assigns a single related document.
    pub fn relate(mut self, relationship: &str, target: DocumentHandle) -> Self {
        self.relations.insert(
            relationship.to_string(),
            Related::One(Reference::Pending(target)),
        );
        self
    }

    /// Assigns several related documents.
    pub fn relate_many(
        mut self,
        relationship: &str,
        targets: impl IntoIterator<Item = DocumentHandle>,
    ) -> Self {
        self.relations.insert(
            relationship.to_string(),
            Related::Many(targets.into_iter().map(Reference::Pending).collect()),
        );
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn related(&self, relationship: &str) -> Option<&Related> {
        self.relations.get(relationship)
    }

    /// Resolves every pending reference of `relationship`.
    pub async fn resolve(
        &mut self,
        relationship: &str,
        catalog: &Catalog,
        transport: &dyn Transport,
    ) -> Result<&Related, Error> {
        let related = self
            .relations
            .get_mut(relationship)
            .ok_or_else(|| Error::UnknownRelationship {
                entity: self.entity.clone(),
                relationship: relationship.to_string(),
            })?;
        for reference in related.references_mut() {
            reference.resolve(catalog, transport).await?;
        }
        Ok(&*related)
    }
}
