//! Document store configuration loaded from environment variables.

use crate::error::ConfigError;

/// Connection settings for the queried MongoDB collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// MongoDB connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database holding the target collection.
    pub database: String,
    /// Collection queried when a request names none.
    pub collection: String,
}

impl StoreConfig {
    /// Reads `MONGODB_URI`, `MONGODB_DB` and `MONGODB_COLLECTION`.
    ///
    /// # Errors
    /// [`ConfigError::MissingVar`] when any of them is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let must = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };
        Ok(Self {
            uri: must("MONGODB_URI")?,
            database: must("MONGODB_DB")?,
            collection: must("MONGODB_COLLECTION")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn blank_values_count_as_missing() {
        let vars = HashMap::from([
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("MONGODB_DB", "shop"),
            ("MONGODB_COLLECTION", "  "),
        ]);
        let err = StoreConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("MONGODB_COLLECTION")));
    }

    #[test]
    fn reads_all_three_variables() {
        let vars = HashMap::from([
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("MONGODB_DB", "shop"),
            ("MONGODB_COLLECTION", "users"),
        ]);
        let cfg = StoreConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.database, "shop");
        assert_eq!(cfg.collection, "users");
    }
}
