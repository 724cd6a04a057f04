#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{ErrorKind, Reference, Related, Value};
#[cfg(test)]
use serde_json::json;

#[test]
fn test_materialize_book() {
    let catalog = catalog();
    let rows = vec![json!({
        "_key": "b1",
        "_id": "book/b1",
        "_rev": "1",
        "title": "Dune",
        "pages": 412,
        "tags": ["sf"],
        "author": "author/a1"
    })];
    let instances = catalog.materialize("Book", &rows).unwrap();
    let book = &instances[0];
    assert_eq!(book.key(), Some("b1"));
    assert_eq!(book.get("title"), Some(&Value::String("Dune".to_string())));
    assert_eq!(book.get("pages"), Some(&Value::Int(412)));
    assert_eq!(book.get("genre"), Some(&Value::Null));
    assert_eq!(
        book.related("author"),
        Some(&Related::One(Reference::Pending(DocumentHandle::new("author", "a1"))))
    );
    assert!(book.related("publisher").is_none());
}

#[test]
fn test_malformed_documents() {
    let catalog = catalog();
    let cases = [
        json!("book/b1"),
        json!({"title": "Dune", "pages": 1, "tags": []}),
        json!({"_key": "b1", "_id": "author/b1", "title": "Dune", "pages": 1, "tags": []}),
        json!({"_key": "b1", "title": 7, "pages": 1, "tags": []}),
        json!({"_key": "b1", "pages": 1, "tags": []}),
        json!({"_key": "b1", "title": null, "pages": 1, "tags": []}),
        json!({"_key": "b1", "title": "Dune", "pages": 1, "tags": [], "author": 5}),
    ];
    for case in cases {
        let err = catalog.materialize("Book", &[case.clone()]).unwrap_err();
        assert!(
            matches!(err, Error::MalformedDocument { .. }),
            "{}: {:?}",
            case,
            err
        );
        assert_eq!(err.kind(), ErrorKind::Materialization);
    }
}

#[test]
fn test_materialize_by_origin() {
    let catalog = catalog();
    let rows = vec![
        json!({"_key": "a1", "_id": "author/a1", "name": "Frank"}),
        json!({"_key": "p1", "_id": "publisher/p1", "name": "Chilton", "founded": "1904-01-01T00:00:00Z"}),
    ];
    let instances = catalog.materialize_by_origin(&rows).unwrap();
    assert_eq!(instances[0].entity, "Author");
    assert_eq!(instances[1].entity, "Publisher");
    assert!(matches!(instances[1].get("founded"), Some(Value::Timestamp(_))));

    let err = catalog
        .materialize_by_origin(&[json!({"_key": "m1", "_id": "magazine/m1"})])
        .unwrap_err();
    assert_eq!(err, Error::UnknownEntity("magazine".to_string()));
}

#[test]
fn test_many_relation_from_array() {
    let catalog = catalog();
    let rows = vec![json!({
        "_key": "u1",
        "name": "ann",
        "follows": ["user/u2", "user/u3"],
        "followers": "user/u4"
    })];
    let user = catalog.materialize("User", &rows).unwrap().remove(0);
    assert_eq!(user.related("follows").unwrap().references().len(), 2);
    assert_eq!(user.related("followers").unwrap().references().len(), 1);
}

#[tokio::test]
async fn test_lazy_reference_resolution() {
    let catalog = catalog();
    let transport = MemoryTransport::new()
        .respond(vec![json!({"_key": "a1", "_id": "author/a1", "name": "Frank", "born": 1920})]);

    let rows = vec![json!({
        "_key": "b1",
        "title": "Dune",
        "pages": 412,
        "tags": [],
        "author": "author/a1"
    })];
    let mut book = catalog.materialize("Book", &rows).unwrap().remove(0);
    assert_eq!(transport.calls(), 0);

    let related = match book.resolve("author", &catalog, &transport).await {
        Ok(related) => related.clone(),
        Err(err) => panic!("Error: {:#?}", err),
    };
    let author = related.references()[0].get().unwrap();
    assert_eq!(author.entity, "Author");
    assert_eq!(author.get("name"), Some(&Value::String("Frank".to_string())));

    let executed = transport.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].query(), "RETURN DOCUMENT(@lit0)");
    assert_eq!(executed[0].bind_vars()["lit0"], json!("author/a1"));

    // already resolved: no further round trip
    book.resolve("author", &catalog, &transport).await.unwrap();
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_missing_reference_is_not_found() {
    let catalog = catalog();
    let transport = MemoryTransport::new().respond(vec![serde_json::Value::Null]);
    let mut reference = Reference::Pending(DocumentHandle::new("author", "gone"));
    let err = reference.resolve(&catalog, &transport).await.unwrap_err();
    assert_eq!(err, Error::NotFound);
    assert!(!reference.is_resolved());
}

#[tokio::test]
async fn test_fetch() {
    let catalog = catalog();
    let transport = MemoryTransport::new().respond(vec![
        json!({"_key": "b1", "title": "Dune", "pages": 412, "tags": []}),
        json!({"_key": "b2", "title": "Emma", "pages": 300, "tags": []}),
    ]);
    let tree = catalog
        .query("Book")
        .where_gt("pages", 100)
        .order_by("title")
        .build()
        .unwrap();
    let books = match catalog.fetch(&tree, &transport).await {
        Ok(books) => books,
        Err(err) => panic!("Error: {:#?}", err),
    };
    assert_eq!(books.len(), 2);
    assert_eq!(books[1].key(), Some("b2"));
}

#[tokio::test]
async fn test_fetch_rejects_before_io() {
    let catalog = catalog();
    let transport = MemoryTransport::new();

    let tree = catalog.query("Book").limit_offset(0, 0).build().unwrap();
    let err = catalog.fetch(&tree, &transport).await.unwrap_err();
    assert_eq!(err, Error::InvalidLimit { count: 0, offset: 0 });

    let tree = catalog
        .query("Book")
        .where_eq("title", arangraph::Operand::param("title"))
        .build()
        .unwrap();
    let err = catalog.fetch(&tree, &transport).await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    let tree = catalog.query("Book").project(["title"]).build().unwrap();
    let err = catalog.fetch(&tree, &transport).await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    assert_eq!(transport.calls(), 0);
}
