//! Chat persistence settings loaded from environment variables.

use query_engine::ConfigError;

pub const DEFAULT_CHATS_COLLECTION: &str = "chats";

/// Where chat sessions are stored.
///
/// Sessions may live in a separate deployment from the queried data, so
/// every key has an `_APP` variant that takes precedence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatStoreConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl ChatStoreConfig {
    /// Reads
    /// - `MONGODB_URI_APP`, else `MONGODB_URI` (required)
    /// - `MONGODB_DATABASE_APP`, else `MONGODB_DB` (required)
    /// - `MONGODB_COLLECTION_APP`, else `chats`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok(Self {
            uri: get("MONGODB_URI_APP")
                .or_else(|| get("MONGODB_URI"))
                .ok_or(ConfigError::MissingVar("MONGODB_URI_APP or MONGODB_URI"))?,
            database: get("MONGODB_DATABASE_APP")
                .or_else(|| get("MONGODB_DB"))
                .ok_or(ConfigError::MissingVar("MONGODB_DATABASE_APP or MONGODB_DB"))?,
            collection: get("MONGODB_COLLECTION_APP")
                .unwrap_or_else(|| DEFAULT_CHATS_COLLECTION.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn app_variables_take_precedence() {
        let cfg = ChatStoreConfig::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://data:27017"),
            ("MONGODB_URI_APP", "mongodb://app:27017"),
            ("MONGODB_DB", "shop"),
            ("MONGODB_COLLECTION_APP", "sessions"),
        ]))
        .unwrap();
        assert_eq!(cfg.uri, "mongodb://app:27017");
        assert_eq!(cfg.database, "shop");
        assert_eq!(cfg.collection, "sessions");
    }

    #[test]
    fn falls_back_to_data_connection_and_default_collection() {
        let cfg = ChatStoreConfig::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://data:27017"),
            ("MONGODB_DB", "shop"),
        ]))
        .unwrap();
        assert_eq!(cfg.collection, DEFAULT_CHATS_COLLECTION);
        assert!(ChatStoreConfig::from_lookup(lookup(&[])).is_err());
    }
}
