pub mod binding;
pub mod definition;
pub mod resolver;

pub use binding::{
    Direction, EdgeLink, GRAPH_NAMING_VERSION, GraphBinding, GraphNameOrigin, GraphTopology, Hop,
    default_edge_collection, synthesize_graph_name,
};
pub use definition::{EdgeDefinition, ExistingSchema, GraphDefinition, SchemaAction};
pub use resolver::GraphResolver;
