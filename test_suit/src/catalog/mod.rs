use std::collections::VecDeque;
use std::sync::Mutex;

use arangraph::{Catalog, CompiledQuery, DocumentHandle, Entity, Error, SchemaRegistry, Transport};
use async_trait::async_trait;

pub mod test_builder;
pub mod test_compiler;
pub mod test_graph;
pub mod test_materialize;
pub mod test_mutation;
pub mod test_registry;
pub mod test_schema;

/// Example: Author object
#[derive(Entity, Debug)]
#[arangraph(type_name = "Author")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub born: Option<i64>,
}

/// Example: Book object
#[derive(Entity, Debug)]
#[arangraph(type_name = "Book")]
pub struct Book {
    pub id: String,
    pub title: String,
    #[arangraph(default = 0)]
    pub pages: i64,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    #[arangraph(relation = "Author", related_name = "books")]
    pub author: Option<DocumentHandle>,
    #[arangraph(relation = "Publisher")]
    pub publisher: Option<DocumentHandle>,
}

#[derive(Entity, Debug)]
#[arangraph(type_name = "Publisher")]
pub struct Publisher {
    pub id: String,
    pub name: String,
    pub founded: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Entity, Debug)]
#[arangraph(type_name = "ModelA")]
pub struct ModelA {
    pub id: String,
    pub label: String,
    #[arangraph(relation = "ModelB", graph = "ABTest")]
    pub modelb: Option<DocumentHandle>,
}

#[derive(Entity, Debug)]
#[arangraph(type_name = "ModelB")]
pub struct ModelB {
    pub id: String,
    pub label: String,
    #[arangraph(relation = "ModelA", graph = "ABTest")]
    pub modela: Option<DocumentHandle>,
}

/// Example: self-referencing follow graph
#[derive(Entity, Debug)]
#[arangraph(type_name = "User")]
pub struct User {
    pub id: String,
    pub name: String,
    #[arangraph(relation = "User", related_name = "followers", many)]
    pub follows: Vec<DocumentHandle>,
}

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register_entity::<Book>().unwrap();
    registry.register_entity::<Author>().unwrap();
    registry.register_entity::<Publisher>().unwrap();
    registry.register_entity::<ModelA>().unwrap();
    registry.register_entity::<ModelB>().unwrap();
    registry.register_entity::<User>().unwrap();
    registry
}

pub fn catalog() -> Catalog {
    match registry().resolve() {
        Ok(catalog) => catalog,
        Err(err) => panic!("Error: {:#?}", err),
    }
}

/// Records every statement and answers from a queue of canned result sets.
#[derive(Default)]
pub struct MemoryTransport {
    responses: Mutex<VecDeque<Vec<serde_json::Value>>>,
    executed: Mutex<Vec<CompiledQuery>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, rows: Vec<serde_json::Value>) -> Self {
        self.responses.lock().unwrap().push_back(rows);
        self
    }

    pub fn executed(&self) -> Vec<CompiledQuery> {
        self.executed.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn execute(&self, query: &CompiledQuery) -> Result<Vec<serde_json::Value>, Error> {
        // every statement must be serializable as a cursor request
        query.request_body()?;
        self.executed.lock().unwrap().push(query.clone());
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}
