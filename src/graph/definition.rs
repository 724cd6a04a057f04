use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::binding::GraphTopology;
use crate::error::Error;
use crate::schema::SchemaRegistry;

/// One edge collection of a named graph and the vertex collections it joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// Body of a graph creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub name: String,
    #[serde(rename = "edgeDefinitions")]
    pub edge_definitions: Vec<EdgeDefinition>,
}

/// Collections and graphs already present in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExistingSchema {
    pub collections: BTreeSet<String>,
    pub edge_collections: BTreeSet<String>,
    pub graphs: BTreeMap<String, Vec<EdgeDefinition>>,
}

/// Step needed to bring the database in line with the catalog. Produced in
/// execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SchemaAction {
    CreateCollection { name: String },
    CreateEdgeCollection { name: String },
    CreateGraph { definition: GraphDefinition },
    AddEdgeDefinition { graph: String, definition: EdgeDefinition },
    ReplaceEdgeDefinition { graph: String, definition: EdgeDefinition },
}

/// Graph definitions sorted by graph name; edge definitions sorted by
/// collection.
pub fn graph_definitions(topology: &GraphTopology) -> Vec<GraphDefinition> {
    topology
        .graphs()
        .into_iter()
        .map(|(name, bindings)| {
            let mut merged: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<&str>)> = BTreeMap::new();
            for link in bindings.iter().flat_map(|b| b.links()) {
                let entry = merged.entry(link.collection.as_str()).or_default();
                entry.0.insert(link.from_collection.as_str());
                entry.1.insert(link.to_collection.as_str());
            }
            GraphDefinition {
                name: name.to_string(),
                edge_definitions: merged
                    .into_iter()
                    .map(|(collection, (from, to))| EdgeDefinition {
                        collection: collection.to_string(),
                        from: from.into_iter().map(str::to_string).collect(),
                        to: to.into_iter().map(str::to_string).collect(),
                    })
                    .collect(),
            }
        })
        .collect()
}

pub fn plan_schema(
    registry: &SchemaRegistry,
    topology: &GraphTopology,
    existing: &ExistingSchema,
) -> Result<Vec<SchemaAction>, Error> {
    let mut actions = Vec::new();

    for collection in registry.collection_names() {
        if existing.edge_collections.contains(collection) {
            return Err(Error::CollectionNameCollision(collection.clone()));
        }
        if !existing.collections.contains(collection) {
            actions.push(SchemaAction::CreateCollection {
                name: collection.clone(),
            });
        }
    }

    let definitions = graph_definitions(topology);

    let edge_collections: BTreeSet<&str> = definitions
        .iter()
        .flat_map(|g| g.edge_definitions.iter().map(|e| e.collection.as_str()))
        .collect();
    for collection in edge_collections {
        if existing.collections.contains(collection) {
            return Err(Error::CollectionNameCollision(collection.to_string()));
        }
        if !existing.edge_collections.contains(collection) {
            actions.push(SchemaAction::CreateEdgeCollection {
                name: collection.to_string(),
            });
        }
    }

    for definition in definitions {
        let Some(current) = existing.graphs.get(&definition.name) else {
            actions.push(SchemaAction::CreateGraph { definition });
            continue;
        };
        for edge in definition.edge_definitions {
            match current.iter().find(|e| e.collection == edge.collection) {
                None => actions.push(SchemaAction::AddEdgeDefinition {
                    graph: definition.name.clone(),
                    definition: edge,
                }),
                Some(found) if !same_vertices(found, &edge) => {
                    actions.push(SchemaAction::ReplaceEdgeDefinition {
                        graph: definition.name.clone(),
                        definition: edge,
                    })
                }
                Some(_) => {}
            }
        }
    }

    debug!(actions = actions.len(), "planned schema changes");
    Ok(actions)
}

fn same_vertices(a: &EdgeDefinition, b: &EdgeDefinition) -> bool {
    let set = |v: &[String]| v.iter().cloned().collect::<BTreeSet<_>>();
    set(&a.from) == set(&b.from) && set(&a.to) == set(&b.to)
}
