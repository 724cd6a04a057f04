use std::fmt::Display;

use crate::schema::FieldType;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /* ---------------- declaration ---------------- */
    DuplicateEntity(String),
    UnresolvedRelationshipTarget {
        source: String,
        relationship: String,
        target: String,
    },
    GraphNameCollision {
        graph: String,
        first: String,
        second: String,
    },
    CollectionNameCollision(String),
    InvalidDeclaration(String),

    /* ---------------- query construction ---------------- */
    UnknownEntity(String),
    UnknownField {
        entity: String,
        path: String,
    },
    UnknownRelationship {
        entity: String,
        relationship: String,
    },
    InvalidLimit {
        count: i64,
        offset: i64,
    },
    UnsupportedAggregate(String),
    TraversalDepthExceeded {
        requested: u32,
        max: u32,
    },
    TypeMismatch {
        field: String,
        expected: FieldType,
    },
    InvalidQuery(String),
    UnknownParameter(String),

    /* ---------------- materialization ---------------- */
    MalformedDocument {
        entity: String,
        reason: String,
    },
    NotFound,

    /* ---------------- transport ---------------- */
    Serialize(String),
    Deserialize(String),
    Storage(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal at registration time; no catalog is produced.
    Declaration,
    /// Raised before any backend I/O; the caller can fix the query.
    QueryConstruction,
    /// Backend data disagrees with the declared schema.
    Materialization,
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Declaration => "declaration",
            ErrorKind::QueryConstruction => "query_construction",
            ErrorKind::Materialization => "materialization",
            ErrorKind::Transport => "transport",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateEntity(_)
            | Error::UnresolvedRelationshipTarget { .. }
            | Error::GraphNameCollision { .. }
            | Error::CollectionNameCollision(_)
            | Error::InvalidDeclaration(_) => ErrorKind::Declaration,
            Error::UnknownEntity(_)
            | Error::UnknownField { .. }
            | Error::UnknownRelationship { .. }
            | Error::InvalidLimit { .. }
            | Error::UnsupportedAggregate(_)
            | Error::TraversalDepthExceeded { .. }
            | Error::TypeMismatch { .. }
            | Error::InvalidQuery(_)
            | Error::UnknownParameter(_) => ErrorKind::QueryConstruction,
            Error::MalformedDocument { .. } | Error::NotFound => ErrorKind::Materialization,
            Error::Serialize(_) | Error::Deserialize(_) | Error::Storage(_) => {
                ErrorKind::Transport
            }
        }
    }

    pub(crate) fn malformed(entity: &str, reason: impl Into<String>) -> Self {
        Error::MalformedDocument {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DuplicateEntity(name) => write!(f, "Entity `{}` is already registered", name),
            Error::UnresolvedRelationshipTarget {
                source,
                relationship,
                target,
            } => write!(
                f,
                "Relationship `{}.{}` targets unregistered entity `{}`",
                source, relationship, target
            ),
            Error::GraphNameCollision {
                graph,
                first,
                second,
            } => write!(
                f,
                "Graph name `{}` is claimed by both {} and {}",
                graph, first, second
            ),
            Error::CollectionNameCollision(name) => {
                write!(f, "Collection name `{}` is used more than once", name)
            }
            Error::InvalidDeclaration(err) => write!(f, "Invalid declaration: {}", err),
            Error::UnknownEntity(name) => write!(f, "Unknown entity `{}`", name),
            Error::UnknownField { entity, path } => {
                write!(f, "Unknown field `{}` on entity `{}`", path, entity)
            }
            Error::UnknownRelationship {
                entity,
                relationship,
            } => write!(
                f,
                "Unknown relationship `{}` on entity `{}`",
                relationship, entity
            ),
            Error::InvalidLimit { count, offset } => write!(
                f,
                "Invalid limit: count {} offset {} (count must be positive, offset non-negative)",
                count, offset
            ),
            Error::UnsupportedAggregate(name) => {
                write!(f, "Unsupported aggregate function `{}`", name)
            }
            Error::TraversalDepthExceeded { requested, max } => write!(
                f,
                "Traversal depth {} exceeds the configured maximum of {}",
                requested, max
            ),
            Error::TypeMismatch { field, expected } => {
                write!(f, "Type mismatch on `{}`: expected {}", field, expected)
            }
            Error::InvalidQuery(err) => write!(f, "Invalid query: {}", err),
            Error::UnknownParameter(name) => write!(f, "Unknown query parameter `{}`", name),
            Error::MalformedDocument { entity, reason } => {
                write!(f, "Malformed `{}` document: {}", entity, reason)
            }
            Error::NotFound => write!(f, "Not found"),
            Error::Serialize(err) => write!(f, "Serialization error: {}", err),
            Error::Deserialize(err) => write!(f, "Deserialization error: {}", err),
            Error::Storage(err) => write!(f, "Storage error: {}", err),
        }
    }
}

impl std::error::Error for Error {}
