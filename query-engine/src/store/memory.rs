//! In-memory document store for tests and local development.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use super::matcher::{matches, project, sort_documents};
use super::{DocumentStore, StoreFuture};
use crate::descriptor::{Document, QueryDescriptor};
use crate::error::StoreError;

/// Named collections held in memory, in insertion order.
///
/// # Example
///
/// ```rust
/// use query_engine::{DocumentStore, MemoryStore, QueryDescriptor};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.insert("users", json!({"name": "Ann", "age": 34})).await?;
///
/// let all = store.find(&QueryDescriptor::all("users")).await?;
/// assert_eq!(all.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one document; `value` must be a JSON object.
    pub async fn insert(&self, collection: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.insert_many(collection, [value]).await
    }

    /// Appends documents in order; fails without inserting if any is not an object.
    pub async fn insert_many(
        &self,
        collection: &str,
        values: impl IntoIterator<Item = serde_json::Value>,
    ) -> Result<(), StoreError> {
        let docs = values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::Object(m) => Ok(m),
                other => Err(StoreError::Conversion(format!(
                    "expected a JSON object, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut guard = self.collections.write().await;
        let coll = guard.entry(collection.to_string()).or_default();
        debug!(collection, added = docs.len(), "memory insert");
        coll.extend(docs);
        Ok(())
    }

    /// Number of documents in `collection` (0 if it does not exist).
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    async fn find_impl(&self, query: &QueryDescriptor) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(&query.find) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for doc in docs {
            let keep = match &query.filter {
                Some(f) => matches(doc, f)?,
                None => true,
            };
            if keep {
                hits.push(doc.clone());
            }
        }
        drop(guard);

        if let Some(sort) = &query.sort {
            sort_documents(&mut hits, sort);
        }
        if let Some(p) = query.projection.as_ref().filter(|p| !p.is_empty()) {
            hits = hits
                .iter()
                .map(|d| project(d, p))
                .collect::<Result<Vec<_>, _>>()?;
        }

        debug!(collection = %query.find, count = hits.len(), "memory query");
        Ok(hits)
    }
}

impl DocumentStore for MemoryStore {
    fn sample<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            let guard = self.collections.read().await;
            Ok::<_, StoreError>(guard.get(collection).and_then(|docs| docs.first().cloned()))
        })
    }

    fn find<'a>(&'a self, query: &'a QueryDescriptor) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(self.find_impl(query))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok::<_, StoreError>(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{SortDirection, SortSpec};
    use serde_json::json;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_many(
                "users",
                [
                    json!({"_id": 1, "name": "Ann", "age": 34}),
                    json!({"_id": 2, "name": "Bob", "age": 27}),
                    json!({"_id": 3, "name": "Cid", "age": 41}),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn sample_returns_first_document_or_none() {
        let store = seeded().await;
        let sample = store.sample("users").await.unwrap().unwrap();
        assert_eq!(sample["name"], json!("Ann"));
        assert!(store.sample("orders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_filters_sorts_then_projects() {
        let store = seeded().await;
        let query = QueryDescriptor {
            find: "users".into(),
            filter: Some(json!({"age": {"$gt": 30}}).as_object().unwrap().clone()),
            projection: Some(json!({"_id": 0, "name": 1}).as_object().unwrap().clone()),
            sort: Some(SortSpec::new(vec![("age".into(), SortDirection::Descending)])),
        };
        let out = store.find(&query).await.unwrap();
        assert_eq!(out, vec![
            json!({"name": "Cid"}).as_object().unwrap().clone(),
            json!({"name": "Ann"}).as_object().unwrap().clone(),
        ]);
    }

    #[tokio::test]
    async fn non_object_insert_is_rejected() {
        let store = MemoryStore::new();
        let err = store.insert("users", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, StoreError::Conversion(_)));
        assert_eq!(store.count("users").await, 0);
    }

    #[tokio::test]
    async fn unsupported_operator_surfaces_as_error() {
        let store = seeded().await;
        let mut query = QueryDescriptor::all("users");
        query.filter = Some(json!({"$text": {"$search": "Ann"}}).as_object().unwrap().clone());
        assert!(matches!(
            store.find(&query).await,
            Err(StoreError::Unsupported(_))
        ));
    }
}
