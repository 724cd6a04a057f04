use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::Cardinality;

/// Version of the graph/edge collection naming rule. Bump on any change to
/// [`synthesize_graph_name`] or [`default_edge_collection`]: names are
/// persisted in the backend.
pub const GRAPH_NAMING_VERSION: u32 = 1;

/// `graph_<target>_<source>`, both lowercased.
pub fn synthesize_graph_name(source: &str, target: &str) -> String {
    format!(
        "graph_{}_{}",
        target.to_lowercase(),
        source.to_lowercase()
    )
}

/// `<source collection>_<relationship>`.
pub fn default_edge_collection(source_collection: &str, relationship: &str) -> String {
    format!("{}_{}", source_collection, relationship)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Outbound => Direction::Inbound,
            Direction::Inbound => Direction::Outbound,
        }
    }

    pub fn as_aql(&self) -> &'static str {
        match self {
            Direction::Outbound => "OUTBOUND",
            Direction::Inbound => "INBOUND",
        }
    }
}

/// One stored direction of a binding: the edge collection holding
/// `source -> target` records for one relationship declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeLink {
    pub source: String,
    pub relationship: String,
    pub target: String,
    pub collection: String,
    pub from_collection: String,
    pub to_collection: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNameOrigin {
    Declared,
    Synthesized,
}

/// A relationship declaration, or a reciprocal pair of them, resolved to a
/// named graph and its edge collection(s).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphBinding {
    graph: String,
    origin: GraphNameOrigin,
    // forward link first; bidirectional bindings carry the reverse second
    links: Vec<EdgeLink>,
}

impl GraphBinding {
    pub(crate) fn new(
        graph: String,
        origin: GraphNameOrigin,
        forward: EdgeLink,
        reverse: Option<EdgeLink>,
    ) -> Self {
        let mut links = vec![forward];
        links.extend(reverse);
        Self {
            graph,
            origin,
            links,
        }
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }

    pub fn origin(&self) -> GraphNameOrigin {
        self.origin
    }

    pub fn forward(&self) -> &EdgeLink {
        &self.links[0]
    }

    pub fn reverse(&self) -> Option<&EdgeLink> {
        self.links.get(1)
    }

    pub fn is_bidirectional(&self) -> bool {
        self.links.len() == 2
    }

    pub fn links(&self) -> impl Iterator<Item = &EdgeLink> {
        self.links.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkRef {
    pub binding: usize,
    pub link: usize,
}

/// A relationship name resolved against one entity type: which edges to
/// follow and where they lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop<'a> {
    pub binding: &'a GraphBinding,
    pub link: &'a EdgeLink,
    pub direction: Direction,
}

impl<'a> Hop<'a> {
    /// Entity type reached by following this hop.
    pub fn target(&self) -> &'a str {
        match self.direction {
            Direction::Outbound => &self.link.target,
            Direction::Inbound => &self.link.source,
        }
    }

    pub fn cardinality(&self) -> crate::schema::Cardinality {
        match self.direction {
            Direction::Outbound => self.link.cardinality,
            Direction::Inbound => Cardinality::Many,
        }
    }

    /// The other declaration of a bidirectional binding.
    pub fn partner(&self) -> Option<&'a EdgeLink> {
        self.binding
            .links()
            .find(|l| l.collection != self.link.collection)
    }

    /// Edge collections to follow, primary first. Bidirectional bindings add
    /// the partner collection in the opposite direction.
    pub fn edge_collections(&self) -> Vec<(Direction, &'a str)> {
        let mut out = vec![(self.direction, self.link.collection.as_str())];
        if let Some(partner) = self.partner() {
            out.push((self.direction.flip(), partner.collection.as_str()));
        }
        out
    }
}

/// Immutable result of graph resolution: every binding plus lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct GraphTopology {
    pub(crate) bindings: Vec<GraphBinding>,
    // (source entity, relationship) -> declaring link
    pub(crate) declared: BTreeMap<(String, String), LinkRef>,
    // (target entity, related name) -> link traversed inbound
    pub(crate) reverse: BTreeMap<(String, String), LinkRef>,
}

impl GraphTopology {
    pub fn bindings(&self) -> &[GraphBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binding of the relationship `relationship` declared on `source`.
    pub fn binding(&self, source: &str, relationship: &str) -> Result<&GraphBinding, Error> {
        self.declared
            .get(&(source.to_string(), relationship.to_string()))
            .map(|r| &self.bindings[r.binding])
            .ok_or_else(|| Error::UnknownRelationship {
                entity: source.to_string(),
                relationship: relationship.to_string(),
            })
    }

    /// Resolves `name` on `entity`: a declared relationship (outbound) or a
    /// reverse accessor (inbound).
    pub fn hop(&self, entity: &str, name: &str) -> Result<Hop<'_>, Error> {
        let key = (entity.to_string(), name.to_string());
        if let Some(r) = self.declared.get(&key) {
            let binding = &self.bindings[r.binding];
            return Ok(Hop {
                binding,
                link: &binding.links[r.link],
                direction: Direction::Outbound,
            });
        }
        if let Some(r) = self.reverse.get(&key) {
            let binding = &self.bindings[r.binding];
            return Ok(Hop {
                binding,
                link: &binding.links[r.link],
                direction: Direction::Inbound,
            });
        }
        Err(Error::UnknownRelationship {
            entity: entity.to_string(),
            relationship: name.to_string(),
        })
    }

    /// Declared relationships and reverse accessors reachable from `entity`.
    pub fn relation_names<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.declared
            .keys()
            .chain(self.reverse.keys())
            .filter(move |(e, _)| e == entity)
            .map(|(_, name)| name.as_str())
    }

    /// Links whose records start at `entity`.
    pub fn outgoing<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a EdgeLink> + 'a {
        self.bindings
            .iter()
            .flat_map(GraphBinding::links)
            .filter(move |l| l.source == entity)
    }

    /// Links whose records end at `entity`.
    pub fn incoming<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a EdgeLink> + 'a {
        self.bindings
            .iter()
            .flat_map(GraphBinding::links)
            .filter(move |l| l.target == entity)
    }

    /// Bindings grouped by graph name.
    pub fn graphs(&self) -> BTreeMap<&str, Vec<&GraphBinding>> {
        let mut out: BTreeMap<&str, Vec<&GraphBinding>> = BTreeMap::new();
        for binding in &self.bindings {
            out.entry(binding.graph()).or_default().push(binding);
        }
        out
    }
}
