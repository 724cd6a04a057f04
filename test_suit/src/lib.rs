mod catalog;

mod test_derive {
    use arangraph::{Cardinality, DocumentHandle, Entity, EntityDecl, FieldType, Value};

    #[derive(Entity, Debug)]
    #[arangraph(type_name = "Article", collection = "articles")]
    pub struct Article {
        pub id: String,
        pub headline: String,
        #[arangraph(default = "draft")]
        pub status: String,
        pub score: Option<f64>,
        pub tags: Vec<String>,
        #[arangraph(relation = "Article", related_name = "cited_by", many)]
        pub cites: Vec<DocumentHandle>,
        #[arangraph(skip)]
        pub cache: Option<String>,
    }

    #[test]
    fn test_derived_declaration() {
        let entity = Article::entity_type();
        assert_eq!(Article::TYPE, "Article");
        assert_eq!(entity.collection_name(), "articles");

        let names: Vec<&str> = entity.attributes().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["headline", "status", "score", "tags"]);

        let status = entity.get_attribute("status").unwrap();
        assert_eq!(status.field_type(), FieldType::String);
        assert_eq!(status.default(), Some(&Value::String("draft".to_string())));

        let score = entity.get_attribute("score").unwrap();
        assert!(score.is_nullable());
        assert_eq!(score.field_type(), FieldType::Float);

        assert_eq!(
            entity.get_attribute("tags").unwrap().field_type(),
            FieldType::Json
        );

        let cites = entity.get_relationship("cites").unwrap();
        assert_eq!(cites.target(), "Article");
        assert_eq!(cites.reverse_name(), Some("cited_by"));
        assert_eq!(cites.kind(), Cardinality::Many);
    }

    #[test]
    fn test_derived_entity_resolves() {
        let mut registry = arangraph::SchemaRegistry::new();
        registry.register_entity::<Article>().unwrap();
        let catalog = registry.resolve().unwrap();

        let binding = catalog.binding("Article", "cites").unwrap();
        assert_eq!(binding.graph(), "graph_article_article");
        assert_eq!(binding.forward().collection, "articles_cites");
    }
}
