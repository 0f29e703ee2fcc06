use std::sync::Arc;

use ai_llm_service::TextGenerator;
use tracing::{debug, error, info, instrument, warn};

use crate::descriptor::{Document, QueryDescriptor};
use crate::error::QueryError;
use crate::parse::parse;
use crate::prompt::{describe_sample, render, render_results};
use crate::store::DocumentStore;

/// Natural-language → MongoDB query translation and execution.
///
/// Both collaborators are injected; the engine holds no other state and is
/// cheap to share behind an `Arc`.
pub struct QueryEngine {
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn TextGenerator>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn DocumentStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Asks the generation backend for a descriptor answering `natural_query`.
    ///
    /// One sample document of `collection` is shown to the backend as a
    /// description of the data shape.
    ///
    /// # Errors
    /// [`QueryError::EmptyCollection`] if there is nothing to sample, backend
    /// and store failures, or any [`parse`] error.
    #[instrument(skip_all, fields(collection = %collection))]
    pub async fn translate(
        &self,
        natural_query: &str,
        collection: &str,
    ) -> Result<QueryDescriptor, QueryError> {
        let sample = self
            .store
            .sample(collection)
            .await?
            .ok_or_else(|| QueryError::EmptyCollection(collection.to_string()))?;

        let prompt = render(natural_query, &describe_sample(&sample), collection);
        debug!(prompt_chars = prompt.len(), "requesting query descriptor");

        let raw = self.generator.generate(&prompt).await?;
        debug!(reply = %raw, "generation reply");

        let descriptor = parse(&raw)?;
        info!(query = %descriptor.to_json(), "translated");
        Ok(descriptor)
    }

    /// Parses a raw generation reply. See [`crate::parse`].
    pub fn parse(&self, raw: &str) -> Result<QueryDescriptor, QueryError> {
        parse(raw)
    }

    /// Runs `descriptor` against `collection`, ignoring whatever `find` says.
    #[instrument(skip_all, fields(collection = %collection))]
    pub async fn execute(
        &self,
        mut descriptor: QueryDescriptor,
        collection: &str,
    ) -> Result<Vec<Document>, QueryError> {
        if descriptor.find != collection {
            warn!(
                declared = %descriptor.find,
                "descriptor targets another collection; using the requested one"
            );
            descriptor.find = collection.to_string();
        }

        let docs = self.store.find(&descriptor).await?;
        debug!(count = docs.len(), "executed");
        Ok(docs)
    }

    /// translate → execute → pretty JSON.
    pub async fn try_run(&self, natural_query: &str, collection: &str) -> Result<String, QueryError> {
        let descriptor = self.translate(natural_query, collection).await?;
        let docs = self.execute(descriptor, collection).await?;
        Ok(render_results(docs))
    }

    /// Like [`QueryEngine::try_run`], with failures rendered as their message.
    pub async fn run(&self, natural_query: &str, collection: &str) -> String {
        match self.try_run(natural_query, collection).await {
            Ok(out) => out,
            Err(e) => {
                error!(collection, error = %e, "query failed");
                e.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::GenerateFuture;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::store::MemoryStore;

    /// Replies with a fixed text and records prompts.
    struct Canned {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl TextGenerator for Canned {
        fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = self.reply.clone();
            Box::pin(async move { Ok::<_, ai_llm_service::AiLlmError>(reply) })
        }
    }

    fn canned(reply: &str) -> Arc<Canned> {
        Arc::new(Canned {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn empty_collection_is_reported_by_name() {
        let engine = QueryEngine::new(Arc::new(MemoryStore::new()), canned("{}"));
        let out = engine.run("anything", "users").await;
        assert_eq!(
            out,
            "No documents found in the collection 'users' to derive a schema."
        );
    }

    #[tokio::test]
    async fn prompt_includes_sample_and_collection() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert("users", json!({"name": "Ann", "age": 34}))
            .await
            .unwrap();
        let generator = canned(r#"{"find": "users", "filter": {}}"#);
        let engine = QueryEngine::new(store, generator.clone());

        engine.translate("everyone", "users").await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"age\": 34"));
        assert!(prompts[0].contains("Natural Language Query: everyone"));
    }
}
