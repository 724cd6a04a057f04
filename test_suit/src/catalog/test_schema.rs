#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{EdgeDefinition, ExistingSchema, GraphDefinition, SchemaAction};

#[cfg(test)]
fn edge(collection: &str, from: &str, to: &str) -> EdgeDefinition {
    EdgeDefinition {
        collection: collection.to_string(),
        from: vec![from.to_string()],
        to: vec![to.to_string()],
    }
}

#[test]
fn test_graph_definitions() {
    let catalog = catalog();
    let definitions = catalog.graph_definitions();
    let names: Vec<&str> = definitions.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["ABTest", "graph_author_book", "graph_publisher_book", "graph_user_user"]
    );
    assert_eq!(
        definitions[0],
        GraphDefinition {
            name: "ABTest".to_string(),
            edge_definitions: vec![
                edge("modela_modelb", "modela", "modelb"),
                edge("modelb_modela", "modelb", "modela"),
            ],
        }
    );

    let body = serde_json::to_value(&definitions[1]).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "name": "graph_author_book",
            "edgeDefinitions": [{"collection": "book_author", "from": ["book"], "to": ["author"]}]
        })
    );
}

#[test]
fn test_plan_on_empty_database() {
    let catalog = catalog();
    let actions = catalog.plan_schema(&ExistingSchema::default()).unwrap();

    let collections: Vec<&str> = actions
        .iter()
        .filter_map(|a| match a {
            SchemaAction::CreateCollection { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        collections,
        vec!["author", "book", "modela", "modelb", "publisher", "user"]
    );

    let edges = actions
        .iter()
        .filter(|a| matches!(a, SchemaAction::CreateEdgeCollection { .. }))
        .count();
    assert_eq!(edges, 5);

    let graphs = actions
        .iter()
        .filter(|a| matches!(a, SchemaAction::CreateGraph { .. }))
        .count();
    assert_eq!(graphs, 4);

    // collections before edge collections before graphs
    assert!(matches!(actions.first(), Some(SchemaAction::CreateCollection { .. })));
    assert!(matches!(actions.last(), Some(SchemaAction::CreateGraph { .. })));
}

#[test]
fn test_plan_against_existing_schema() {
    let catalog = catalog();
    let existing: ExistingSchema = serde_json::from_value(serde_json::json!({
        "collections": ["author", "book", "modela", "modelb", "publisher", "user"],
        "edge_collections": ["book_author", "book_publisher", "modela_modelb", "modelb_modela", "user_follows"],
        "graphs": {
            "ABTest": [
                {"collection": "modela_modelb", "from": ["modela"], "to": ["modelb"]}
            ],
            "graph_author_book": [
                {"collection": "book_author", "from": ["book"], "to": ["publisher"]}
            ],
            "graph_publisher_book": [
                {"collection": "book_publisher", "from": ["book"], "to": ["publisher"]}
            ]
        }
    }))
    .unwrap();

    let actions = catalog.plan_schema(&existing).unwrap();
    assert_eq!(
        actions,
        vec![
            SchemaAction::AddEdgeDefinition {
                graph: "ABTest".to_string(),
                definition: edge("modelb_modela", "modelb", "modela"),
            },
            SchemaAction::ReplaceEdgeDefinition {
                graph: "graph_author_book".to_string(),
                definition: edge("book_author", "book", "author"),
            },
            SchemaAction::CreateGraph {
                definition: GraphDefinition {
                    name: "graph_user_user".to_string(),
                    edge_definitions: vec![edge("user_follows", "user", "user")],
                },
            },
        ]
    );
}

#[test]
fn test_plan_rejects_kind_clash() {
    let catalog = catalog();
    let mut existing = ExistingSchema::default();
    existing.edge_collections.insert("book".to_string());
    assert_eq!(
        catalog.plan_schema(&existing).unwrap_err(),
        Error::CollectionNameCollision("book".to_string())
    );

    let mut existing = ExistingSchema::default();
    existing.collections.insert("user_follows".to_string());
    assert_eq!(
        catalog.plan_schema(&existing).unwrap_err(),
        Error::CollectionNameCollision("user_follows".to_string())
    );
}
