pub mod builder;
pub mod op;
pub mod tree;

pub use builder::QueryBuilder;
pub use op::{Condition, QueryOp};
pub use tree::{
    Aggregation, Comparison, FieldRef, Inclusion, Operand, Predicate, QueryNode, QueryTree, Scope,
    SortDirection, Traversal,
};
