use futures::TryStreamExt;
use mongodb::bson::{self, Bson, doc};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{DocumentStore, StoreFuture};
use crate::cfg::StoreConfig;
use crate::descriptor::{Document, QueryDescriptor, SortSpec};
use crate::error::StoreError;

/// [`DocumentStore`] over one MongoDB database.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects using `cfg.uri` and selects `cfg.database`.
    ///
    /// The driver connects lazily; use [`DocumentStore::ping`] to verify
    /// the server is reachable.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&cfg.uri).await?;
        info!(database = %cfg.database, "MongoDB client initialized");
        Ok(Self::from_client(&client, &cfg.database))
    }

    pub fn from_client(client: &Client, database: &str) -> Self {
        Self {
            db: client.database(database),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    #[instrument(skip(self))]
    async fn sample_impl(&self, collection: &str) -> Result<Option<Document>, StoreError> {
        let coll = self.db.collection::<bson::Document>(collection);
        match coll.find_one(doc! {}).await? {
            Some(d) => Ok(Some(from_bson(d)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(collection = %query.find))]
    async fn find_impl(&self, query: &QueryDescriptor) -> Result<Vec<Document>, StoreError> {
        let coll = self.db.collection::<bson::Document>(&query.find);
        let filter = match &query.filter {
            Some(f) => to_bson(f)?,
            None => bson::Document::new(),
        };

        let mut action = coll.find(filter);
        if let Some(p) = query.projection.as_ref().filter(|p| !p.is_empty()) {
            action = action.projection(to_bson(p)?);
        }
        if let Some(s) = query.sort.as_ref().filter(|s| !s.is_empty()) {
            action = action.sort(sort_to_bson(s));
        }

        let cursor = action.await?;
        let docs: Vec<bson::Document> = cursor.try_collect().await?;
        debug!(count = docs.len(), "query returned");
        docs.into_iter().map(from_bson).collect()
    }
}

impl DocumentStore for MongoStore {
    fn sample<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(self.sample_impl(collection))
    }

    fn find<'a>(&'a self, query: &'a QueryDescriptor) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(self.find_impl(query))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.db.run_command(doc! { "ping": 1 }).await?;
            Ok::<_, StoreError>(())
        })
    }
}

/// Relaxed Extended JSON → BSON (`{"$oid": ..}` becomes an `ObjectId`).
pub(crate) fn to_bson(map: &Document) -> Result<bson::Document, StoreError> {
    bson::Document::try_from(map.clone()).map_err(|e| StoreError::Conversion(e.to_string()))
}

/// BSON → relaxed Extended JSON.
pub(crate) fn from_bson(doc: bson::Document) -> Result<Document, StoreError> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Conversion(format!(
            "expected a document, got {other}"
        ))),
    }
}

/// Sort keys as an ordered BSON document.
pub(crate) fn sort_to_bson(spec: &SortSpec) -> bson::Document {
    let mut out = bson::Document::new();
    for (field, dir) in spec.keys() {
        out.insert(field.clone(), dir.as_i32());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SortDirection;
    use serde_json::json;

    #[test]
    fn sort_document_keeps_key_order() {
        let spec = SortSpec::new(vec![
            ("name".into(), SortDirection::Ascending),
            ("age".into(), SortDirection::Descending),
        ]);
        let keys: Vec<_> = sort_to_bson(&spec).keys().cloned().collect();
        assert_eq!(keys, ["name", "age"]);
    }

    #[test]
    fn object_ids_convert_both_ways() {
        let Value::Object(map) = json!({
            "_id": {"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"},
            "age": {"$gt": 30}
        }) else {
            unreachable!()
        };
        let bson_doc = to_bson(&map).unwrap();
        assert!(matches!(bson_doc.get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(from_bson(bson_doc).unwrap(), map);
    }
}
