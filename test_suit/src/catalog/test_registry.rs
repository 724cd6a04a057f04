#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{Attribute, EntityType, ErrorKind, FieldType, Relationship};

#[test]
fn test_duplicate_entity() {
    let mut registry = registry();
    let err = registry.register_entity::<Book>().unwrap_err();
    assert_eq!(err, Error::DuplicateEntity("Book".to_string()));
    assert_eq!(err.kind(), ErrorKind::Declaration);
}

#[test]
fn test_lookup() {
    let registry = registry();
    assert_eq!(registry.lookup("Book").unwrap().collection_name(), "book");
    assert_eq!(
        registry.lookup("Magazine").unwrap_err(),
        Error::UnknownEntity("Magazine".to_string())
    );
    assert_eq!(registry.by_collection("author").unwrap().name(), "Author");
}

#[test]
fn test_reserved_attribute_names() {
    for reserved in ["id", "_key", "_id", "_from", "_to", "_rev"] {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register(EntityType::new("Thing").attribute(Attribute::new(reserved, FieldType::String)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDeclaration(_)), "{}: {:?}", reserved, err);
    }
}

#[test]
fn test_attribute_relationship_clash() {
    let mut registry = SchemaRegistry::new();
    let err = registry
        .register(
            EntityType::new("Book")
                .attribute(Attribute::new("author", FieldType::String))
                .relationship(Relationship::new("author", "Author")),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDeclaration(_)));
}

#[test]
fn test_default_must_fit_type() {
    let mut registry = SchemaRegistry::new();
    let err = registry
        .register(
            EntityType::new("Book")
                .attribute(Attribute::new("pages", FieldType::Integer).with_default("many")),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDeclaration(_)));
}

#[test]
fn test_collection_collision() {
    let mut registry = SchemaRegistry::new();
    registry.register(EntityType::new("Book")).unwrap();
    let err = registry
        .register(EntityType::new("Novel").collection("book"))
        .unwrap_err();
    assert_eq!(err, Error::CollectionNameCollision("book".to_string()));
}

#[test]
fn test_target_registered_after_source() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(EntityType::new("Book").relationship(Relationship::new("author", "Author")))
        .unwrap();
    registry.register(EntityType::new("Author")).unwrap();
    assert!(registry.resolve().is_ok());
}

#[test]
fn test_unresolved_target_produces_no_catalog() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(EntityType::new("Book").relationship(Relationship::new("author", "Author")))
        .unwrap();
    let err = registry.resolve().unwrap_err();
    assert!(matches!(err, Error::UnresolvedRelationshipTarget { .. }));
}

#[test]
fn test_related_name_clashes_with_target_member() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(EntityType::new("Author").attribute(Attribute::new("books", FieldType::Json)))
        .unwrap();
    registry
        .register(
            EntityType::new("Book")
                .relationship(Relationship::new("author", "Author").related_name("books")),
        )
        .unwrap();
    assert!(matches!(
        registry.resolve().unwrap_err(),
        Error::InvalidDeclaration(_)
    ));
}

#[test]
fn test_related_name_declared_twice() {
    let mut registry = SchemaRegistry::new();
    registry.register(EntityType::new("Author")).unwrap();
    registry
        .register(
            EntityType::new("Book")
                .relationship(Relationship::new("author", "Author").related_name("works"))
                .relationship(Relationship::new("editor", "Author").related_name("works")),
        )
        .unwrap();
    assert!(matches!(
        registry.resolve().unwrap_err(),
        Error::InvalidDeclaration(_)
    ));
}

#[test]
fn test_edge_collection_clashes_with_document_collection() {
    let mut registry = SchemaRegistry::new();
    registry.register(EntityType::new("Author")).unwrap();
    registry
        .register(
            EntityType::new("Book")
                .relationship(Relationship::new("author", "Author").edge_collection("author")),
        )
        .unwrap();
    assert_eq!(
        registry.resolve().unwrap_err(),
        Error::CollectionNameCollision("author".to_string())
    );
}
