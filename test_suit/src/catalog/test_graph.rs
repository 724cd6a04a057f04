#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{Direction, EntityType, GraphNameOrigin, Relationship};

#[test]
fn test_unhinted_relationship_gets_synthesized_graph() {
    let catalog = catalog();
    let binding = catalog.binding("Book", "author").unwrap();
    assert_eq!(binding.graph(), "graph_author_book");
    assert_eq!(binding.origin(), GraphNameOrigin::Synthesized);
    assert!(!binding.is_bidirectional());

    let link = binding.forward();
    assert_eq!(link.collection, "book_author");
    assert_eq!(link.from_collection, "book");
    assert_eq!(link.to_collection, "author");

    let tree = catalog
        .query("Book")
        .where_eq("author.name", "X")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN book\nLET hit = FIRST(\n  FOR t0 IN 1..1 OUTBOUND doc book_author\n  FILTER t0.name == @lit0\n  LIMIT 1\n  RETURN true\n)\nFILTER hit != null\nRETURN doc"
    );
    assert_eq!(compiled.bind_vars()["lit0"], serde_json::json!("X"));
}

#[test]
fn test_reciprocal_hints_form_one_binding() {
    let catalog = catalog();
    let from_a = catalog.binding("ModelA", "modelb").unwrap();
    let from_b = catalog.binding("ModelB", "modela").unwrap();
    assert_eq!(from_a, from_b);
    assert_eq!(from_a.graph(), "ABTest");
    assert_eq!(from_a.origin(), GraphNameOrigin::Declared);
    assert!(from_a.is_bidirectional());

    let ab_graphs = catalog
        .topology()
        .bindings()
        .iter()
        .filter(|b| b.graph() == "ABTest")
        .count();
    assert_eq!(ab_graphs, 1);

    let tree = catalog
        .query("ModelA")
        .where_eq("modelb.label", "x")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains(
        "FOR t0 IN 1..1 OUTBOUND doc modela_modelb, INBOUND modelb_modela OPTIONS { order: \"bfs\", uniqueVertices: \"global\" }"
    ));

    let tree = catalog
        .query("ModelB")
        .where_eq("modela.label", "x")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains(
        "FOR t0 IN 1..1 OUTBOUND doc modelb_modela, INBOUND modela_modelb"
    ));
}

#[test]
fn test_reverse_accessor_hop() {
    let catalog = catalog();
    let hop = catalog.topology().hop("Author", "books").unwrap();
    assert_eq!(hop.direction, Direction::Inbound);
    assert_eq!(hop.target(), "Book");
    assert_eq!(hop.link.collection, "book_author");

    let err = catalog.topology().hop("Author", "publisher").unwrap_err();
    assert_eq!(
        err,
        Error::UnknownRelationship {
            entity: "Author".to_string(),
            relationship: "publisher".to_string(),
        }
    );
}

#[test]
fn test_self_relationship() {
    let catalog = catalog();
    let binding = catalog.binding("User", "follows").unwrap();
    assert_eq!(binding.graph(), "graph_user_user");
    assert_eq!(binding.forward().collection, "user_follows");

    let followers = catalog.topology().hop("User", "followers").unwrap();
    assert_eq!(followers.direction, Direction::Inbound);
    assert_eq!(followers.target(), "User");
}

#[test]
fn test_declared_hint_equal_to_synthesized_name() {
    let mut registry = SchemaRegistry::new();
    registry.register(EntityType::new("Author")).unwrap();
    registry.register(EntityType::new("Publisher")).unwrap();
    registry
        .register(
            EntityType::new("Book")
                .relationship(Relationship::new("author", "Author"))
                .relationship(Relationship::new("publisher", "Publisher").graph("graph_author_book")),
        )
        .unwrap();
    let err = registry.resolve().unwrap_err();
    match err {
        Error::GraphNameCollision { graph, .. } => assert_eq!(graph, "graph_author_book"),
        err => panic!("Error: {:#?}", err),
    }
}

#[test]
fn test_synthesized_names_from_different_pairs_collide() {
    let mut registry = SchemaRegistry::new();
    registry.register(EntityType::new("Alpha")).unwrap();
    registry.register(EntityType::new("Alpha_beta")).unwrap();
    registry
        .register(EntityType::new("Beta_gamma").relationship(Relationship::new("alpha", "Alpha")))
        .unwrap();
    registry
        .register(EntityType::new("Gamma").relationship(Relationship::new("parent", "Alpha_beta")))
        .unwrap();
    match registry.resolve().unwrap_err() {
        Error::GraphNameCollision { graph, .. } => assert_eq!(graph, "graph_alpha_beta_gamma"),
        err => panic!("Error: {:#?}", err),
    }
}

#[test]
fn test_same_pair_shares_synthesized_graph() {
    let mut registry = SchemaRegistry::new();
    registry.register(EntityType::new("Author")).unwrap();
    registry
        .register(
            EntityType::new("Book")
                .relationship(Relationship::new("author", "Author"))
                .relationship(Relationship::new("editor", "Author")),
        )
        .unwrap();
    let catalog = registry.resolve().unwrap();
    let graphs = catalog.topology().graphs();
    assert_eq!(graphs.len(), 1);
    assert_eq!(graphs["graph_author_book"].len(), 2);
}

#[test]
fn test_resolution_ignores_registration_order() {
    let forward = catalog();

    let mut registry = SchemaRegistry::new();
    registry.register_entity::<User>().unwrap();
    registry.register_entity::<ModelB>().unwrap();
    registry.register_entity::<ModelA>().unwrap();
    registry.register_entity::<Publisher>().unwrap();
    registry.register_entity::<Author>().unwrap();
    registry.register_entity::<Book>().unwrap();
    let backward = registry.resolve().unwrap();

    assert_eq!(forward.topology().bindings(), backward.topology().bindings());
    assert_eq!(forward.graph_definitions(), backward.graph_definitions());
}
