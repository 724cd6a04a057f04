use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const MAX_TRAVERSAL_DEPTH_ENV: &str = "ARANGRAPH_MAX_TRAVERSAL_DEPTH";
pub const DISTINCT_TRAVERSALS_ENV: &str = "ARANGRAPH_DISTINCT_TRAVERSALS";

/// Knobs read once when a [`crate::Catalog`] is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on `1..depth` in any traversal clause.
    pub max_traversal_depth: u32,
    /// Return each root document once when a query crosses a relationship.
    /// When off, traversals are flattened into the outer loop and a root
    /// appears once per matching related document.
    pub distinct_traversals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_traversal_depth: 8,
            distinct_traversals: true,
        }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| Error::Deserialize(e.to_string()))?;
        config.validate()
    }

    /// Defaults overridden by `ARANGRAPH_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Config::default();
        if let Some(raw) = lookup(MAX_TRAVERSAL_DEPTH_ENV) {
            config.max_traversal_depth = raw.trim().parse().map_err(|_| {
                Error::Deserialize(format!("{} must be a positive integer, got `{}`", MAX_TRAVERSAL_DEPTH_ENV, raw))
            })?;
        }
        if let Some(raw) = lookup(DISTINCT_TRAVERSALS_ENV) {
            config.distinct_traversals = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(Error::Deserialize(format!(
                        "{} must be a boolean, got `{}`",
                        DISTINCT_TRAVERSALS_ENV, raw
                    )));
                }
            };
        }
        config.validate()
    }

    fn validate(self) -> Result<Self, Error> {
        if self.max_traversal_depth == 0 {
            return Err(Error::Deserialize(
                "max_traversal_depth must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{ "max_traversal_depth": 3 }"#).unwrap();
        assert_eq!(config.max_traversal_depth, 3);
        assert!(config.distinct_traversals);
    }

    #[test]
    fn test_env_lookup() {
        let config = Config::from_lookup(|key| match key {
            MAX_TRAVERSAL_DEPTH_ENV => Some("4".to_string()),
            DISTINCT_TRAVERSALS_ENV => Some("off".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.max_traversal_depth, 4);
        assert!(!config.distinct_traversals);

        let err = Config::from_lookup(|_| Some("nope".to_string())).unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(Config::from_json(r#"{ "max_traversal_depth": 0 }"#).is_err());
    }
}
