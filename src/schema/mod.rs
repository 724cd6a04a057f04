pub mod entity;
pub mod registry;
pub mod value;

pub use entity::*;
pub use registry::*;
pub use value::*;
