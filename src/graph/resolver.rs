use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use super::binding::{
    EdgeLink, GraphBinding, GraphNameOrigin, GraphTopology, LinkRef, default_edge_collection,
    synthesize_graph_name,
};
use crate::error::Error;
use crate::schema::{EntityType, Relationship, SchemaRegistry};

/// One relationship declaration in the resolution arena.
struct Decl<'a> {
    source: &'a EntityType,
    relationship: &'a Relationship,
}

impl Decl<'_> {
    fn label(&self) -> String {
        format!("{}.{}", self.source.name(), self.relationship.name())
    }

    fn pairs_with(&self, other: &Decl<'_>) -> bool {
        match (self.relationship.graph_hint(), other.relationship.graph_hint()) {
            (Some(a), Some(b)) => {
                a == b
                    && self.relationship.target() == other.source.name()
                    && other.relationship.target() == self.source.name()
            }
            _ => false,
        }
    }
}

/// Turns relationship declarations into graph bindings.
pub struct GraphResolver;

impl GraphResolver {
    /// Runs once, after every entity type is registered.
    ///
    /// Pass 1 collects all declarations into an arena ordered by (source
    /// type, relationship name) so the outcome does not depend on
    /// registration order. Pass 2 pairs reciprocal declarations sharing a
    /// graph-name hint; the rest become unidirectional bindings.
    pub fn resolve(registry: &SchemaRegistry) -> Result<GraphTopology, Error> {
        // ---- pass 1: collect ----
        let mut arena: Vec<Decl<'_>> = Vec::new();
        for entity in registry.entities() {
            let mut relationships: Vec<&Relationship> = entity.relationships().iter().collect();
            relationships.sort_by(|a, b| a.name().cmp(b.name()));
            for relationship in relationships {
                if !registry.contains(relationship.target()) {
                    return Err(Error::UnresolvedRelationshipTarget {
                        source: entity.name().to_string(),
                        relationship: relationship.name().to_string(),
                        target: relationship.target().to_string(),
                    });
                }
                arena.push(Decl {
                    source: entity,
                    relationship,
                });
            }
        }

        // ---- pass 2: pair ----
        let mut partner: Vec<Option<usize>> = vec![None; arena.len()];
        for i in 0..arena.len() {
            if partner[i].is_some() {
                continue;
            }
            let found = (i + 1..arena.len())
                .find(|&j| partner[j].is_none() && arena[i].pairs_with(&arena[j]));
            if let Some(j) = found {
                partner[i] = Some(j);
                partner[j] = Some(i);
            }
        }

        let declared_graphs: BTreeMap<&str, String> = arena
            .iter()
            .filter_map(|d| d.relationship.graph_hint().map(|g| (g, d.label())))
            .collect();

        let mut topology = GraphTopology::default();
        let mut synthesized: BTreeMap<String, (String, String, String)> = BTreeMap::new();
        let mut collections: BTreeSet<String> = registry.collection_names().cloned().collect();

        for i in 0..arena.len() {
            if matches!(partner[i], Some(j) if j < i) {
                continue;
            }
            let decl = &arena[i];
            let (graph, origin) = match decl.relationship.graph_hint() {
                Some(hint) => (hint.to_string(), GraphNameOrigin::Declared),
                None => {
                    let name =
                        synthesize_graph_name(decl.source.name(), decl.relationship.target());
                    Self::claim_synthesized(&name, decl, &declared_graphs, &mut synthesized)?;
                    (name, GraphNameOrigin::Synthesized)
                }
            };

            let forward = Self::link(registry, decl)?;
            let reverse = match partner[i] {
                Some(j) => Some(Self::link(registry, &arena[j])?),
                None => None,
            };

            let index = topology.bindings.len();
            let binding = GraphBinding::new(graph, origin, forward, reverse);
            for (position, link) in binding.links().enumerate() {
                if !collections.insert(link.collection.clone()) {
                    return Err(Error::CollectionNameCollision(link.collection.clone()));
                }
                let link_ref = LinkRef {
                    binding: index,
                    link: position,
                };
                topology
                    .declared
                    .insert((link.source.clone(), link.relationship.clone()), link_ref);
            }
            trace!(
                graph = binding.graph(),
                source = %binding.forward().source,
                relationship = %binding.forward().relationship,
                bidirectional = binding.is_bidirectional(),
                "resolved graph binding"
            );
            topology.bindings.push(binding);
        }

        Self::register_reverse_accessors(registry, &arena, &mut topology)?;

        debug!(
            bindings = topology.bindings.len(),
            graphs = topology.graphs().len(),
            "graph resolution complete"
        );
        Ok(topology)
    }

    fn claim_synthesized(
        name: &str,
        decl: &Decl<'_>,
        declared_graphs: &BTreeMap<&str, String>,
        synthesized: &mut BTreeMap<String, (String, String, String)>,
    ) -> Result<(), Error> {
        if let Some(owner) = declared_graphs.get(name) {
            return Err(Error::GraphNameCollision {
                graph: name.to_string(),
                first: format!("declared graph on {}", owner),
                second: format!("synthesized name of {}", decl.label()),
            });
        }
        let pair = (
            decl.relationship.target().to_string(),
            decl.source.name().to_string(),
        );
        match synthesized.get(name) {
            Some((target, source, label)) if (target, source) != (&pair.0, &pair.1) => {
                Err(Error::GraphNameCollision {
                    graph: name.to_string(),
                    first: label.clone(),
                    second: decl.label(),
                })
            }
            Some(_) => Ok(()),
            None => {
                synthesized.insert(name.to_string(), (pair.0, pair.1, decl.label()));
                Ok(())
            }
        }
    }

    fn link(registry: &SchemaRegistry, decl: &Decl<'_>) -> Result<EdgeLink, Error> {
        let target = registry.lookup(decl.relationship.target())?;
        let from_collection = decl.source.collection_name();
        let collection = match decl.relationship.declared_edge_collection() {
            Some(c) => c.to_string(),
            None => default_edge_collection(&from_collection, decl.relationship.name()),
        };
        Ok(EdgeLink {
            source: decl.source.name().to_string(),
            relationship: decl.relationship.name().to_string(),
            target: target.name().to_string(),
            collection,
            from_collection,
            to_collection: target.collection_name(),
            cardinality: decl.relationship.kind(),
        })
    }

    fn register_reverse_accessors(
        registry: &SchemaRegistry,
        arena: &[Decl<'_>],
        topology: &mut GraphTopology,
    ) -> Result<(), Error> {
        for decl in arena {
            let Some(reverse) = decl.relationship.reverse_name() else {
                continue;
            };
            let target = registry.lookup(decl.relationship.target())?;
            if target.get_attribute(reverse).is_some()
                || target.get_relationship(reverse).is_some()
            {
                return Err(Error::InvalidDeclaration(format!(
                    "related name `{}` of {} clashes with a member of `{}`",
                    reverse,
                    decl.label(),
                    target.name()
                )));
            }
            let key = (decl.source.name().to_string(), decl.relationship.name().to_string());
            let Some(link_ref) = topology.declared.get(&key).copied() else {
                continue;
            };
            let reverse_key = (target.name().to_string(), reverse.to_string());
            if topology.reverse.insert(reverse_key, link_ref).is_some() {
                return Err(Error::InvalidDeclaration(format!(
                    "related name `{}` is declared twice on `{}`",
                    reverse,
                    target.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{Attribute, FieldType};

    fn registry(entities: Vec<EntityType>) -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        for entity in entities {
            registry.register(entity).unwrap();
        }
        registry
    }

    #[test]
    fn test_synthesized_name_for_unhinted_relationship() {
        let registry = registry(vec![
            EntityType::new("Author").attribute(Attribute::new("name", FieldType::String)),
            EntityType::new("Book")
                .attribute(Attribute::new("title", FieldType::String))
                .relationship(Relationship::new("author", "Author")),
        ]);
        let topology = GraphResolver::resolve(&registry).unwrap();
        let binding = topology.binding("Book", "author").unwrap();
        assert_eq!(binding.graph(), "graph_author_book");
        assert_eq!(binding.origin(), GraphNameOrigin::Synthesized);
        assert_eq!(binding.forward().collection, "book_author");
        assert!(!binding.is_bidirectional());
    }

    #[test]
    fn test_pairing_ignores_registration_order() {
        let a = EntityType::new("ModelA").relationship(Relationship::new("modelb", "ModelB").graph("ABTest"));
        let b = EntityType::new("ModelB").relationship(Relationship::new("modela", "ModelA").graph("ABTest"));

        let first = GraphResolver::resolve(&registry(vec![a.clone(), b.clone()])).unwrap();
        let second = GraphResolver::resolve(&registry(vec![b, a])).unwrap();
        assert_eq!(first.bindings(), second.bindings());
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_unregistered_target() {
        let registry = registry(vec![
            EntityType::new("Book").relationship(Relationship::new("author", "Author")),
        ]);
        let err = GraphResolver::resolve(&registry).unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedRelationshipTarget {
                source: "Book".to_string(),
                relationship: "author".to_string(),
                target: "Author".to_string(),
            }
        );
    }
}
