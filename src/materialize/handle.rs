use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// `collection/key`, the backend's `_id` of a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentHandle {
    pub collection: String,
    pub key: String,
}

impl DocumentHandle {
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }
}

impl Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

impl FromStr for DocumentHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((collection, key))
                if !collection.is_empty() && !key.is_empty() && !key.contains('/') =>
            {
                Ok(DocumentHandle::new(collection, key))
            }
            _ => Err(Error::Deserialize(format!(
                "`{}` is not a document handle",
                s
            ))),
        }
    }
}

impl Serialize for DocumentHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_handle() {
        let handle: DocumentHandle = "book/123".parse().unwrap();
        assert_eq!(handle, DocumentHandle::new("book", "123"));
        assert_eq!(handle.to_string(), "book/123");

        assert!("book".parse::<DocumentHandle>().is_err());
        assert!("/123".parse::<DocumentHandle>().is_err());
        assert!("book/".parse::<DocumentHandle>().is_err());
        assert!("a/b/c".parse::<DocumentHandle>().is_err());
    }
}
