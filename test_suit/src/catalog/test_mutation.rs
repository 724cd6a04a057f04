#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{FieldType, Instance};
#[cfg(test)]
use serde_json::json;

#[cfg(test)]
fn book() -> Instance {
    Instance::new("Book")
        .with_key("b1")
        .set("title", "Dune")
        .set("tags", vec!["sf"])
}

#[test]
fn test_insert_with_relationship() {
    let catalog = catalog();
    let instance = book().relate("author", DocumentHandle::new("author", "a1"));
    let statements = catalog.compile_insert(&instance).unwrap();
    assert_eq!(statements.len(), 2);

    assert_eq!(statements[0].query(), "INSERT @doc INTO book RETURN NEW");
    assert_eq!(
        statements[0].bind_vars()["doc"],
        json!({"_key": "b1", "title": "Dune", "pages": 0, "genre": null, "tags": ["sf"]})
    );

    assert_eq!(
        statements[1].query(),
        "INSERT { _from: @from, _to: @to } INTO book_author RETURN NEW"
    );
    assert_eq!(statements[1].bind_vars()["from"], json!("book/b1"));
    assert_eq!(statements[1].bind_vars()["to"], json!("author/a1"));
}

#[test]
fn test_insert_generates_key() {
    let catalog = catalog();
    let statements = catalog
        .compile_insert(&Instance::new("Author").set("name", "Frank"))
        .unwrap();
    let key = statements[0].bind_vars()["doc"]["_key"].as_str().unwrap().to_string();
    let parsed = uuid::Uuid::parse_str(&key).unwrap();
    assert_eq!(parsed.get_version_num(), 7);
}

#[test]
fn test_insert_checks_attributes() {
    let catalog = catalog();

    let err = catalog
        .compile_insert(&Instance::new("Book").set("tags", vec!["sf"]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    let err = catalog.compile_insert(&book().set("isbn", "1")).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownField {
            entity: "Book".to_string(),
            path: "isbn".to_string(),
        }
    );

    let err = catalog.compile_insert(&book().set("pages", "many")).unwrap_err();
    assert_eq!(
        err,
        Error::TypeMismatch {
            field: "pages".to_string(),
            expected: FieldType::Integer,
        }
    );
}

#[test]
fn test_update_replaces_edges() {
    let catalog = catalog();
    let instance = Instance::new("User")
        .with_key("u1")
        .set("name", "ann")
        .relate_many(
            "follows",
            [
                DocumentHandle::new("user", "u2"),
                DocumentHandle::new("user", "u3"),
            ],
        );
    let statements = catalog.compile_update(&instance).unwrap();
    let queries: Vec<&str> = statements.iter().map(|s| s.query()).collect();
    assert_eq!(
        queries,
        vec![
            "UPDATE @key WITH @patch IN user RETURN NEW",
            "FOR e IN user_follows FILTER e._from == @source REMOVE e IN user_follows",
            "INSERT { _from: @from, _to: @to } INTO user_follows RETURN NEW",
            "INSERT { _from: @from, _to: @to } INTO user_follows RETURN NEW",
        ]
    );
    assert_eq!(statements[0].bind_vars()["patch"], json!({"name": "ann"}));
    assert_eq!(statements[3].bind_vars()["to"], json!("user/u3"));

    let err = catalog
        .compile_update(&Instance::new("User").set("name", "ann"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn test_remove_sweeps_both_directions() {
    let catalog = catalog();
    let statements = catalog.compile_remove("User", "u1").unwrap();
    let queries: Vec<&str> = statements.iter().map(|s| s.query()).collect();
    assert_eq!(
        queries,
        vec![
            "FOR e IN user_follows FILTER e._from == @handle REMOVE e IN user_follows",
            "FOR e IN user_follows FILTER e._to == @handle REMOVE e IN user_follows",
            "REMOVE @key IN user",
        ]
    );
    assert_eq!(statements[0].bind_vars()["handle"], json!("user/u1"));

    let statements = catalog.compile_remove("Author", "a1").unwrap();
    assert_eq!(
        statements[0].query(),
        "FOR e IN book_author FILTER e._to == @handle REMOVE e IN book_author"
    );
    assert_eq!(statements.len(), 2);
}

#[test]
fn test_link_through_reverse_accessor() {
    let catalog = catalog();
    let author = DocumentHandle::new("author", "a1");
    let book = DocumentHandle::new("book", "b1");
    let statements = catalog.compile_link(&author, "books", &book).unwrap();
    let queries: Vec<&str> = statements.iter().map(|s| s.query()).collect();
    // a book has one author: its current edge goes first
    assert_eq!(
        queries,
        vec![
            "FOR e IN book_author FILTER e._from == @source REMOVE e IN book_author",
            "INSERT { _from: @from, _to: @to } INTO book_author RETURN NEW",
        ]
    );
    assert_eq!(statements[0].bind_vars()["source"], json!("book/b1"));
    assert_eq!(statements[1].bind_vars()["from"], json!("book/b1"));
    assert_eq!(statements[1].bind_vars()["to"], json!("author/a1"));

    let publisher = DocumentHandle::new("publisher", "p1");
    let err = catalog.compile_link(&book, "author", &publisher).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn test_unlink() {
    let catalog = catalog();
    let book = DocumentHandle::new("book", "b1");
    let author = DocumentHandle::new("author", "a1");

    let statements = catalog.compile_unlink(&book, "author", Some(&author)).unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].query(),
        "FOR e IN book_author FILTER e._from == @source AND e._to == @target REMOVE e IN book_author"
    );

    let statements = catalog.compile_unlink(&author, "books", None).unwrap();
    assert_eq!(
        statements[0].query(),
        "FOR e IN book_author FILTER e._to == @source REMOVE e IN book_author"
    );
}

#[test]
fn test_link_replaces_single_valued_edge() {
    let catalog = catalog();
    let book = DocumentHandle::new("book", "b1");
    let statements = catalog
        .compile_link(&book, "author", &DocumentHandle::new("author", "a2"))
        .unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].query(),
        "FOR e IN book_author FILTER e._from == @source REMOVE e IN book_author"
    );
    assert_eq!(statements[1].bind_vars()["to"], json!("author/a2"));

    // many-valued on both ends: nothing is cleared
    let statements = catalog
        .compile_link(
            &DocumentHandle::new("user", "u1"),
            "follows",
            &DocumentHandle::new("user", "u2"),
        )
        .unwrap();
    assert_eq!(statements.len(), 1);
}

#[test]
fn test_bidirectional_unlink_sweeps_both_collections() {
    let catalog = catalog();
    let a = DocumentHandle::new("modela", "1");
    let b = DocumentHandle::new("modelb", "2");

    let statements = catalog.compile_unlink(&a, "modelb", Some(&b)).unwrap();
    let queries: Vec<&str> = statements.iter().map(|s| s.query()).collect();
    assert_eq!(
        queries,
        vec![
            "FOR e IN modela_modelb FILTER e._from == @source AND e._to == @target REMOVE e IN modela_modelb",
            "FOR e IN modelb_modela FILTER e._to == @source AND e._from == @target REMOVE e IN modelb_modela",
        ]
    );
    for statement in &statements {
        assert_eq!(statement.bind_vars()["source"], json!("modela/1"));
        assert_eq!(statement.bind_vars()["target"], json!("modelb/2"));
    }
}

#[test]
fn test_bidirectional_assign_replaces_both_sides() {
    let catalog = catalog();
    let a = DocumentHandle::new("modela", "1");
    let b = DocumentHandle::new("modelb", "2");

    let statements = catalog.compile_assign(&a, "modelb", &[b.clone()]).unwrap();
    let queries: Vec<&str> = statements.iter().map(|s| s.query()).collect();
    assert_eq!(
        queries,
        vec![
            "FOR e IN modela_modelb FILTER e._from == @source REMOVE e IN modela_modelb",
            "FOR e IN modelb_modela FILTER e._to == @source REMOVE e IN modelb_modela",
            "FOR e IN modelb_modela FILTER e._from == @source REMOVE e IN modelb_modela",
            "FOR e IN modela_modelb FILTER e._to == @source REMOVE e IN modela_modelb",
            "INSERT { _from: @from, _to: @to } INTO modela_modelb RETURN NEW",
        ]
    );
    assert_eq!(statements[1].bind_vars()["source"], json!("modela/1"));
    assert_eq!(statements[2].bind_vars()["source"], json!("modelb/2"));
    assert_eq!(statements[4].bind_vars()["from"], json!("modela/1"));
    assert_eq!(statements[4].bind_vars()["to"], json!("modelb/2"));

    // the read side follows the same two collections
    let tree = catalog.query("ModelA").where_eq("modelb.label", "x").build().unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled
        .query()
        .contains("OUTBOUND doc modela_modelb, INBOUND modelb_modela"));
}

#[test]
fn test_assign_respects_cardinality() {
    let catalog = catalog();
    let book = DocumentHandle::new("book", "b1");
    let err = catalog
        .compile_assign(
            &book,
            "author",
            &[
                DocumentHandle::new("author", "a1"),
                DocumentHandle::new("author", "a2"),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    let statements = catalog.compile_assign(&book, "author", &[]).unwrap();
    assert_eq!(statements.len(), 1);
}

#[tokio::test]
async fn test_statements_run_in_order() {
    let catalog = catalog();
    let transport = MemoryTransport::new();
    let instance = book().relate("publisher", DocumentHandle::new("publisher", "p1"));
    let statements = catalog.compile_insert(&instance).unwrap();

    match transport.execute_all(&statements).await {
        Ok(results) => assert_eq!(results.len(), 2),
        Err(err) => panic!("Error: {:#?}", err),
    }
    let executed = transport.executed();
    assert_eq!(executed[0].query(), "INSERT @doc INTO book RETURN NEW");
    assert!(executed[1].query().contains("INTO book_publisher"));
}
