#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{Condition, Config, FieldType, Operand, QueryNode, QueryOp, SortDirection, Value};

#[test]
fn test_relationship_filter_inserts_one_traversal() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .where_eq("author.name", "X")
        .where_gt("author.born", 1900)
        .build()
        .unwrap();

    let traversals: Vec<_> = tree.traversals().collect();
    assert_eq!(traversals.len(), 1);
    assert_eq!(traversals[0].relationship, "author");
    assert_eq!(traversals[0].target, "Author");
    assert_eq!(traversals[0].depth, 1);

    // traversal precedes the filters that use it
    assert!(matches!(tree.nodes()[0], QueryNode::Traverse(_)));
    assert!(matches!(tree.nodes()[1], QueryNode::Filter(_)));
    assert!(matches!(tree.nodes()[2], QueryNode::Filter(_)));
}

#[test]
fn test_nested_relationship_path() {
    let catalog = catalog();
    let tree = catalog
        .query("Author")
        .where_eq("books.publisher.name", "Ace")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN author\nLET hit = FIRST(\n  FOR t0 IN 1..1 INBOUND doc book_author\n  FOR t1 IN 1..1 OUTBOUND t0 book_publisher\n  FILTER t1.name == @lit0\n  LIMIT 1\n  RETURN true\n)\nFILTER hit != null\nRETURN doc"
    );
}

#[test]
fn test_unknown_field() {
    let catalog = catalog();
    let err = catalog.query("Book").where_eq("isbn", "1").build().unwrap_err();
    assert_eq!(
        err,
        Error::UnknownField {
            entity: "Book".to_string(),
            path: "isbn".to_string(),
        }
    );

    let err = catalog
        .query("Book")
        .where_eq("author.nickname", "X")
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        Error::UnknownField {
            entity: "Author".to_string(),
            path: "author.nickname".to_string(),
        }
    );
}

#[test]
fn test_unknown_relationship() {
    let catalog = catalog();
    let err = catalog
        .query("Book")
        .where_eq("editor.name", "X")
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        Error::UnknownRelationship {
            entity: "Book".to_string(),
            relationship: "editor".to_string(),
        }
    );

    let err = catalog.query("Book").traverse("sequel", 1).build().unwrap_err();
    assert!(matches!(err, Error::UnknownRelationship { .. }));
}

#[test]
fn test_unknown_entity() {
    let catalog = catalog();
    let err = catalog.query("Magazine").limit(1).build().unwrap_err();
    assert_eq!(err, Error::UnknownEntity("Magazine".to_string()));
}

#[test]
fn test_type_mismatch() {
    let catalog = catalog();
    let err = catalog.query("Book").where_eq("pages", "many").build().unwrap_err();
    assert_eq!(
        err,
        Error::TypeMismatch {
            field: "pages".to_string(),
            expected: FieldType::Integer,
        }
    );

    let err = catalog
        .query("Book")
        .where_starts_with("pages", "1")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    let err = catalog
        .query("Book")
        .where_in("title", vec![1, 2])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    assert!(catalog.query("Book").where_eq("genre", Value::Null).build().is_ok());
    assert!(catalog.query("Book").where_contains("tags", "sf").build().is_ok());
}

#[test]
fn test_first_error_latches() {
    let catalog = catalog();
    let err = catalog
        .query("Book")
        .where_eq("isbn", "1")
        .where_eq("pages", "many")
        .limit(10)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::UnknownField { .. }));
}

#[test]
fn test_traversal_depth() {
    let catalog = catalog();
    let tree = catalog.query("User").traverse("follows", 3).build().unwrap();
    let traversal = tree.traversals().next().unwrap();
    assert_eq!(traversal.depth, 3);

    let err = catalog.query("User").traverse("follows", 0).build().unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    let err = catalog.query("User").traverse("follows", 9).build().unwrap_err();
    assert_eq!(err, Error::TraversalDepthExceeded { requested: 9, max: 8 });

    let strict = registry()
        .resolve_with(Config {
            max_traversal_depth: 2,
            ..Config::default()
        })
        .unwrap();
    let err = strict.query("User").traverse("follows", 3).build().unwrap_err();
    assert_eq!(err, Error::TraversalDepthExceeded { requested: 3, max: 2 });
}

#[test]
fn test_traversal_reuse() {
    let catalog = catalog();
    let tree = catalog
        .query("User")
        .traverse("follows", 2)
        .where_eq("follows.name", "ann")
        .build()
        .unwrap();
    assert_eq!(tree.traversals().count(), 1);

    let err = catalog
        .query("User")
        .where_eq("follows.name", "ann")
        .traverse("follows", 2)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn test_relationship_is_not_an_attribute() {
    let catalog = catalog();
    let err = catalog.query("Book").order_by("author").build().unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn test_key_path() {
    let catalog = catalog();
    let tree = catalog.query("Book").where_eq("id", "b1").build().unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains("FILTER doc._key == @lit0"));
}

#[test]
fn test_parameter_names() {
    let catalog = catalog();
    assert!(
        catalog
            .query("Book")
            .where_eq("title", Operand::param("title"))
            .build()
            .is_ok()
    );
    let err = catalog
        .query("Book")
        .where_eq("title", Operand::param("lit0"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn test_operation_list_from_json() {
    let catalog = catalog();
    let ops: Vec<QueryOp> = serde_json::from_value(serde_json::json!([
        {"op": "filter", "condition": {"kind": "compare", "path": "author.name", "op": "eq", "value": "X"}},
        {"op": "filter", "condition": {"kind": "compare", "path": "title", "op": "eq", "value": {"param": "title"}}},
        {"op": "order", "fields": ["title"], "direction": "desc"},
        {"op": "limit", "count": 5}
    ]))
    .unwrap();
    assert_eq!(
        ops[3],
        QueryOp::Limit {
            count: 5,
            offset: 0
        }
    );
    assert_eq!(
        ops[2],
        QueryOp::Order {
            fields: vec!["title".to_string()],
            direction: SortDirection::Descending,
        }
    );
    assert_eq!(
        ops[1],
        QueryOp::Filter {
            condition: Condition::eq("title", Operand::param("title")),
        }
    );

    let from_ops = catalog.build("Book", ops).unwrap();
    let from_builder = catalog
        .query("Book")
        .where_eq("author.name", "X")
        .where_eq("title", Operand::param("title"))
        .order_by_desc("title")
        .limit(5)
        .build()
        .unwrap();
    assert_eq!(from_ops, from_builder);
}

#[test]
fn test_operation_list_limit_checked_at_compile() {
    let catalog = catalog();
    let ops: Vec<QueryOp> =
        serde_json::from_value(serde_json::json!([{"op": "limit", "count": 0}])).unwrap();
    let tree = match catalog.build("Book", ops) {
        Ok(tree) => tree,
        Err(err) => panic!("Error: {:#?}", err),
    };
    assert_eq!(
        catalog.compile(&tree).unwrap_err(),
        Error::InvalidLimit { count: 0, offset: 0 }
    );
}
