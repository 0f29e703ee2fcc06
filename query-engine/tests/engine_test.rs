use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_llm_service::{AiLlmError, GenerateFuture, TextGenerator};
use query_engine::{MemoryStore, QueryDescriptor, QueryEngine, parse};
use serde_json::{Value, json};

/// Fake backend: replies with a fixed text (or times out) and remembers
/// every prompt.
struct Scripted {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

impl TextGenerator for Scripted {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.reply.clone();
        Box::pin(async move { reply.ok_or(AiLlmError::Timeout(Duration::from_secs(1))) })
    }
}

async fn users_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many(
            "users",
            [
                json!({"name": "Ann", "age": 34, "city": "Lyon"}),
                json!({"name": "Bob", "age": 27, "city": "Oslo"}),
                json!({"name": "Cid", "age": 41, "city": "Lyon"}),
                json!({"name": "Dee", "age": 30, "city": "Rome"}),
            ],
        )
        .await
        .unwrap();
    store
        .insert("other", json!({"name": "ghost", "age": 99}))
        .await
        .unwrap();
    store
}

fn names(result: &str) -> Vec<String> {
    let rows: Vec<Value> = serde_json::from_str(result).unwrap();
    rows.iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn parse_extracts_object_from_chatter() {
    let d = parse(r#"Sure! {"find":"users","filter":{"age":{"$gt":30}}} Hope that helps"#).unwrap();
    assert_eq!(d.to_json(), r#"{"find":"users","filter":{"age":{"$gt":30}}}"#);
}

#[test]
fn parse_is_idempotent() {
    let replies = [
        r#"{"find":"users","filter":{"age":{"$gte":18}},"projection":{"name":1,"_id":0},"sort":[["age",-1],["name","asc"]]}"#,
        "```json\n{\"find\": \"users\", \"filter\": {\"user\\_id\": 7}}\n```",
        r#"{"find":"users","filter":{"path":"C:\\_tmp"}}"#,
    ];
    for raw in replies {
        let first = parse(raw).unwrap();
        let second = parse(&first.to_json()).unwrap();
        assert_eq!(first, second, "not idempotent for {raw}");
    }
}

#[tokio::test]
async fn execute_ignores_declared_collection() {
    let store = users_store().await;
    let engine = QueryEngine::new(store, Scripted::ok("{}"));

    let descriptor = QueryDescriptor::from_value(json!({"find": "other", "filter": {}})).unwrap();
    let docs = engine.execute(descriptor, "users").await.unwrap();

    assert_eq!(docs.len(), 4);
    assert!(docs.iter().all(|d| d["name"] != json!("ghost")));
}

#[tokio::test]
async fn run_without_json_reports_extraction_error() {
    let store = users_store().await;
    let engine = QueryEngine::new(store, Scripted::ok("I could not find anything, sorry."));

    let out = engine.run("who lives in Lyon?", "users").await;
    assert!(out.contains("Could not extract JSON"), "{out}");
}

#[tokio::test]
async fn run_sorts_descending_by_age() {
    let store = users_store().await;
    let generator = Scripted::ok(
        "Here is the query:\n```json\n{\"find\": \"users\", \"filter\": {}, \"sort\": {\"age\": -1}}\n```",
    );
    let engine = QueryEngine::new(store, generator);

    let out = engine.run("everyone, oldest first", "users").await;
    assert_eq!(names(&out), ["Cid", "Ann", "Dee", "Bob"]);
}

#[tokio::test]
async fn run_applies_filter_projection_and_pair_sort() {
    let store = users_store().await;
    let generator = Scripted::ok(
        r#"{"find": "people", "filter": {"city": "Lyon"}, "projection": {"_id": 0, "name": 1}, "sort": [["name", "desc"]]}"#,
    );
    let engine = QueryEngine::new(store, generator);

    let out = engine.run("names of people in Lyon", "users").await;
    let rows: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(rows, json!([{"name": "Cid"}, {"name": "Ann"}]));
}

#[tokio::test]
async fn no_matches_render_as_empty_array() {
    let store = users_store().await;
    let generator = Scripted::ok(r#"{"find": "users", "filter": {"age": {"$gt": 500}}}"#);
    let engine = QueryEngine::new(store, generator);

    assert_eq!(engine.run("centenarians", "users").await, "[]");
}

#[tokio::test]
async fn translate_always_sends_a_shape_description() {
    let store = Arc::new(MemoryStore::new());
    store.insert("empty_shape", json!({})).await.unwrap();
    let generator = Scripted::ok(r#"{"find": "empty_shape", "filter": {}}"#);
    let engine = QueryEngine::new(store, generator.clone());

    engine.translate("anything", "empty_shape").await.unwrap();

    let prompts = generator.prompts.lock().unwrap();
    let prompt = &prompts[0];
    let start = prompt.find("':\n\n").unwrap() + 4;
    let end = prompt.find("\n\nUsing the above sample").unwrap();
    assert!(!prompt[start..end].trim().is_empty());
}

#[tokio::test]
async fn backend_failure_is_reported_not_raised() {
    let store = users_store().await;
    let engine = QueryEngine::new(store, Scripted::timing_out());

    let out = engine.run("anyone", "users").await;
    assert!(out.starts_with("Error: text generation failed:"), "{out}");
}

#[tokio::test]
async fn invalid_descriptor_is_reported() {
    let store = users_store().await;
    let engine = QueryEngine::new(store, Scripted::ok(r#"{"filter": {"age": 3}}"#));

    let out = engine.run("anyone", "users").await;
    assert_eq!(out, "Error: invalid query descriptor: missing 'find'");
}

#[tokio::test]
async fn unsupported_operator_is_a_store_failure() {
    let store = users_store().await;
    let engine = QueryEngine::new(
        store,
        Scripted::ok(r#"{"find": "users", "filter": {"$where": "this.age > 3"}}"#),
    );

    let out = engine.run("anyone", "users").await;
    assert!(out.starts_with("Error: document store failure:"), "{out}");
}
