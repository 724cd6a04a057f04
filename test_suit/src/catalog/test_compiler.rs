#[cfg(test)]
use super::*;
#[cfg(test)]
use arangraph::{Condition, Config, Operand};

#[test]
fn test_literals_are_never_inlined() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .where_eq("title", "Robert'); DROP")
        .where_gte("pages", 100)
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(!compiled.query().contains("DROP"));
    assert!(!compiled.query().contains("100"));
    assert_eq!(compiled.bind_vars().len(), 2);
    assert_eq!(compiled.bind_vars()["lit0"], serde_json::json!("Robert'); DROP"));
    assert_eq!(compiled.bind_vars()["lit1"], serde_json::json!(100));
    assert!(compiled.is_ready());
}

#[test]
fn test_invalid_limit() {
    let catalog = catalog();
    for (count, offset) in [(0, 0), (-1, 0), (5, -1)] {
        let tree = catalog
            .query("Book")
            .limit_offset(count, offset)
            .build()
            .unwrap();
        assert_eq!(
            catalog.compile(&tree).unwrap_err(),
            Error::InvalidLimit { count, offset }
        );
    }
}

#[test]
fn test_sort_and_limit() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .order_by_desc("pages")
        .order_by("title")
        .limit_offset(10, 20)
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN book\nSORT doc.pages DESC, doc.title ASC\nLIMIT 20, 10\nRETURN doc"
    );
}

#[test]
fn test_order_on_related_attribute() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .order_by("author.name")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    let expected = [
        "FOR doc IN book",
        "LET hit = FIRST(",
        "  FOR t0 IN 1..1 OUTBOUND doc book_author",
        "  LIMIT 1",
        "  RETURN { v0: t0.name }",
        ")",
        "FILTER hit != null",
        "SORT hit.v0 ASC",
        "RETURN doc",
    ]
    .join("\n");
    assert_eq!(compiled.query(), expected);
}

#[test]
fn test_limit_counts_root_documents() {
    let catalog = catalog();
    let tree = catalog
        .query("Author")
        .where_contains("books.title", "a")
        .where_not_null("name")
        .order_by("name")
        .limit_offset(2, 0)
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    let expected = [
        "FOR doc IN author",
        "FILTER doc.name != null",
        "LET hit = FIRST(",
        "  FOR t0 IN 1..1 INBOUND doc book_author",
        "  FILTER CONTAINS(t0.title, @lit0)",
        "  LIMIT 1",
        "  RETURN true",
        ")",
        "FILTER hit != null",
        "SORT doc.name ASC",
        "LIMIT 0, 2",
        "RETURN doc",
    ]
    .join("\n");
    assert_eq!(compiled.query(), expected);
    assert!(!compiled.query().contains("DISTINCT"));

    // the page is cut from the outer loop, after the join subquery closed
    let query = compiled.query();
    assert!(query.find("FILTER hit != null").unwrap() < query.find("SORT").unwrap());
    assert!(query.find("LIMIT 0, 2").unwrap() > query.find("\n)\n").unwrap());
}

#[test]
fn test_aggregate_counts_root_documents() {
    let catalog = catalog();
    let tree = catalog
        .query("Author")
        .where_contains("books.title", "a")
        .aggregate("count", "name", Vec::<String>::new())
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    let expected = [
        "FOR doc IN author",
        "LET hit = FIRST(",
        "  FOR t0 IN 1..1 INBOUND doc book_author",
        "  FILTER CONTAINS(t0.title, @lit0)",
        "  LIMIT 1",
        "  RETURN true",
        ")",
        "FILTER hit != null",
        "COLLECT AGGREGATE a0 = COUNT(doc.name)",
        "RETURN { \"name__count\": a0 }",
    ]
    .join("\n");
    assert_eq!(compiled.query(), expected);

    let tree = catalog
        .query("Book")
        .aggregate("count", "title", ["author.name"])
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains("  RETURN { v0: t0.name }"));
    assert!(compiled.query().contains(
        "COLLECT g0 = hit.v0 AGGREGATE a0 = COUNT(doc.title)\nRETURN { \"author.name\": g0, \"title__count\": a0 }"
    ));
}

#[test]
fn test_aggregate_with_group_by() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .aggregate("count", "title", ["genre"])
        .aggregate("avg", "pages", ["genre"])
        .order_by("genre")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN book\nCOLLECT g0 = doc.genre AGGREGATE a0 = COUNT(doc.title), a1 = AVERAGE(doc.pages)\nSORT g0 ASC\nRETURN { \"genre\": g0, \"title__count\": a0, \"pages__avg\": a1 }"
    );
}

#[test]
fn test_aggregate_without_group_by() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .aggregate("SUM", "pages", Vec::<String>::new())
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN book\nCOLLECT AGGREGATE a0 = SUM(doc.pages)\nRETURN { \"pages__sum\": a0 }"
    );
}

#[test]
fn test_aggregate_errors() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .aggregate("median", "pages", ["genre"])
        .build()
        .unwrap();
    assert_eq!(
        catalog.compile(&tree).unwrap_err(),
        Error::UnsupportedAggregate("median".to_string())
    );

    let tree = catalog
        .query("Book")
        .aggregate("count", "title", ["genre"])
        .aggregate("max", "pages", Vec::<String>::new())
        .build()
        .unwrap();
    assert!(matches!(catalog.compile(&tree).unwrap_err(), Error::InvalidQuery(_)));

    let tree = catalog
        .query("Book")
        .aggregate("count", "title", ["genre"])
        .order_by("title")
        .build()
        .unwrap();
    assert!(matches!(catalog.compile(&tree).unwrap_err(), Error::InvalidQuery(_)));

    let tree = catalog
        .query("Book")
        .project(["title"])
        .aggregate("count", "title", ["genre"])
        .build()
        .unwrap();
    assert!(matches!(catalog.compile(&tree).unwrap_err(), Error::InvalidQuery(_)));
}

#[test]
fn test_predicate_forms() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .where_contains("title", "War")
        .where_contains("tags", "sf")
        .where_starts_with("title", "The")
        .where_in("genre", vec!["sf", "fantasy"])
        .where_null("genre")
        .where_not_null("title")
        .any_of([Condition::lt("pages", 100), Condition::gt("pages", 900)])
        .filter(Condition::eq("title", "Dune").negate())
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    let expected = [
        "FOR doc IN book",
        "FILTER CONTAINS(doc.title, @lit0)",
        "FILTER @lit1 IN doc.tags",
        "FILTER STARTS_WITH(doc.title, @lit2)",
        "FILTER doc.genre IN @lit3",
        "FILTER doc.genre == null",
        "FILTER doc.title != null",
        "FILTER (doc.pages < @lit4 OR doc.pages > @lit5)",
        "FILTER NOT (doc.title == @lit6)",
        "RETURN doc",
    ]
    .join("\n");
    assert_eq!(compiled.query(), expected);
    assert_eq!(compiled.bind_vars()["lit3"], serde_json::json!(["sf", "fantasy"]));
}

#[test]
fn test_parameters_must_be_bound() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .where_eq("title", Operand::param("title"))
        .where_gt("pages", Operand::param("min_pages"))
        .build()
        .unwrap();
    let mut compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN book\nFILTER doc.title == @title\nFILTER doc.pages > @min_pages\nRETURN doc"
    );
    assert_eq!(compiled.unbound(), &["min_pages".to_string(), "title".to_string()]);
    assert!(matches!(compiled.request_body().unwrap_err(), Error::InvalidQuery(_)));

    assert_eq!(
        compiled.bind("isbn", "1"),
        Err(Error::UnknownParameter("isbn".to_string()))
    );
    compiled.bind("title", "Dune").unwrap();
    compiled.bind("min_pages", 100).unwrap();
    assert!(compiled.is_ready());

    let body = compiled.request_body().unwrap();
    assert_eq!(body["bindVars"]["title"], serde_json::json!("Dune"));
    assert_eq!(body["bindVars"]["min_pages"], serde_json::json!(100));
}

#[test]
fn test_projection() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .project(["title", "author.name", "title"])
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains("  RETURN { v0: t0.name }"));
    assert!(compiled.query().ends_with(
        "FILTER hit != null\nRETURN { \"title\": doc.title, \"author.name\": hit.v0 }"
    ));
    assert!(!tree.returns_documents());
}

#[test]
fn test_projection_keeps_rows_with_equal_values() {
    let catalog = catalog();
    let tree = catalog
        .query("Book")
        .where_eq("author.name", "X")
        .project(["title"])
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    // two books titled alike are two rows; only root documents are deduplicated
    assert!(!compiled.query().contains("DISTINCT"));
    assert!(compiled.query().starts_with("FOR doc IN book\nLET hit = FIRST("));
    assert!(compiled.query().ends_with("FILTER hit != null\nRETURN { \"title\": doc.title }"));
}

#[test]
fn test_include() {
    let catalog = catalog();
    let tree = catalog
        .query("Author")
        .include("books")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN author\nLET i0 = (FOR ri0 IN 1..1 INBOUND doc book_author RETURN DISTINCT ri0._id)\nRETURN MERGE(doc, { \"books\": i0 })"
    );

    let tree = catalog
        .query("Book")
        .include("author")
        .include("author")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains(
        "LET i0 = FIRST(FOR ri0 IN 1..1 OUTBOUND doc book_author RETURN DISTINCT ri0._id)"
    ));
    assert!(!compiled.query().contains("i1"));
}

#[test]
fn test_deep_traversal_options() {
    let catalog = catalog();
    let tree = catalog
        .query("User")
        .traverse("follows", 3)
        .where_eq("follows.name", "ann")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert!(compiled.query().contains(
        "FOR t0 IN 1..3 OUTBOUND doc user_follows OPTIONS { order: \"bfs\", uniqueVertices: \"global\" }"
    ));
}

#[test]
fn test_distinct_can_be_disabled() {
    let catalog = registry()
        .resolve_with(Config {
            distinct_traversals: false,
            ..Config::default()
        })
        .unwrap();
    let tree = catalog
        .query("Book")
        .where_eq("author.name", "X")
        .build()
        .unwrap();
    let compiled = catalog.compile(&tree).unwrap();
    assert_eq!(
        compiled.query(),
        "FOR doc IN book\nFOR t0 IN 1..1 OUTBOUND doc book_author\nFILTER t0.name == @lit0\nRETURN doc"
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let catalog = catalog();
    let build = || {
        catalog
            .query("Book")
            .where_eq("author.name", "X")
            .where_in("genre", vec!["sf"])
            .order_by("title")
            .limit(3)
            .build()
            .unwrap()
    };
    let first = catalog.compile(&build()).unwrap();
    let second = catalog.compile(&build()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
