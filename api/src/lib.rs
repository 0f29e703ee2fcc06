//! HTTP surface: one-shot queries, chat sessions, health.

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::{
    core::app_state::{AppConfig, AppState},
    error_handler::AppError,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        chats::chats_route::{clear_chats, create_chat, get_chat, list_chats, send_message},
        health::health_route::health,
        query::query_route::run_query,
    },
};

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(run_query))
        .route("/chats", post(create_chat).get(list_chats).delete(clear_chats))
        .route("/chats/{id}", get(get_chat))
        .route("/chats/{id}/messages", post(send_message))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Reads configuration, connects backends and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let cfg = AppConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&cfg).await?);

    let listener = tokio::net::TcpListener::bind(&cfg.api_address)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %cfg.api_address, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        // No signal handler: keep serving until the process is killed.
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ai_llm_service::{GenerateFuture, TextGenerator};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use chat_store::{Conversation, MemoryChatStore};
    use query_engine::{MemoryStore, QueryEngine};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Pops replies in order, then repeats the last one.
    struct Replies(Mutex<Vec<String>>);

    impl Replies {
        fn new(replies: &[&str]) -> Arc<Self> {
            let mut v: Vec<String> = replies.iter().map(|s| s.to_string()).collect();
            v.reverse();
            Arc::new(Self(Mutex::new(v)))
        }
    }

    impl TextGenerator for Replies {
        fn generate<'a>(&'a self, _prompt: &'a str) -> GenerateFuture<'a> {
            let mut q = self.0.lock().unwrap();
            let reply = if q.len() > 1 {
                q.pop().unwrap()
            } else {
                q.last().cloned().unwrap_or_default()
            };
            Box::pin(async move { Ok::<_, ai_llm_service::AiLlmError>(reply) })
        }
    }

    async fn app(query_replies: &[&str]) -> Router {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_many(
                "users",
                [
                    json!({"name": "Ann", "age": 34}),
                    json!({"name": "Bob", "age": 27}),
                ],
            )
            .await
            .unwrap();

        let engine = Arc::new(QueryEngine::new(store, Replies::new(query_replies)));
        let conversation = Conversation::new(
            Arc::new(MemoryChatStore::new()),
            Arc::clone(&engine),
            Replies::new(&["Users Over Thirty"]),
            "users",
        );
        router(Arc::new(AppState::new(engine, conversation, None, "users")))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn query_returns_matching_documents() {
        let app = app(&[r#"{"find": "users", "filter": {"age": {"$gt": 30}}, "projection": {"_id": 0, "name": 1}}"#]).await;

        let res = app
            .oneshot(json_request("POST", "/query", json!({"natural_query": "over 30"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        let rows: Value = serde_json::from_str(body["result"].as_str().unwrap()).unwrap();
        assert_eq!(rows, json!([{"name": "Ann"}]));
    }

    #[tokio::test]
    async fn query_failure_is_a_result_string() {
        let app = app(&["no json here"]).await;
        let res = app
            .oneshot(json_request("POST", "/query", json!({"natural_query": "anyone"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(
            body["result"],
            json!("Error: Could not extract JSON object from the LLM response.")
        );
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let app = app(&["{}"]).await;
        let res = app
            .oneshot(json_request("POST", "/query", json!({"natural_query": "   "})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.headers().contains_key("X-Request-Id"));
        let body = body_json(res).await;
        assert_eq!(body["code"], json!("BAD_REQUEST"));
    }

    #[tokio::test]
    async fn malformed_body_gets_json_detail() {
        let app = app(&["{}"]).await;
        let res = app
            .oneshot(json_request("POST", "/query", json!({"question": "x"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(res).await;
        assert!(body["detail"].as_str().unwrap().contains("natural_query"));
        assert!(body["hint"].is_string());
    }

    #[tokio::test]
    async fn chat_lifecycle() {
        let app = app(&[r#"{"find": "users", "filter": {"name": "Bob"}, "projection": {"_id": 0, "age": 1}}"#]).await;

        let res = app
            .clone()
            .oneshot(empty_request("POST", "/chats"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let chat = body_json(res).await;
        assert_eq!(chat["title"], json!("New Chat"));
        let id = chat["id"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/chats/{id}/messages"),
                json!({"content": "how old is Bob?"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let chat = body_json(res).await;
        assert_eq!(chat["title"], json!("Users Over Thirty"));
        assert_eq!(chat["messages"][0]["role"], json!("user"));
        assert_eq!(chat["messages"][1]["role"], json!("assistant"));
        let reply: Value =
            serde_json::from_str(chat["messages"][1]["content"].as_str().unwrap()).unwrap();
        assert_eq!(reply, json!([{"age": 27}]));

        let res = app
            .clone()
            .oneshot(empty_request("GET", "/chats"))
            .await
            .unwrap();
        assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

        let res = app
            .clone()
            .oneshot(empty_request("DELETE", "/chats"))
            .await
            .unwrap();
        assert_eq!(body_json(res).await, json!({"deleted": 1}));

        let res = app
            .oneshot(empty_request("GET", &format!("/chats/{id}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_chat_id_is_bad_request() {
        let app = app(&["{}"]).await;
        let res = app
            .oneshot(empty_request("GET", "/chats/not-an-id"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["code"], json!("INVALID_CHAT_ID"));
    }

    #[tokio::test]
    async fn health_without_llm_reports_store_only() {
        let app = app(&["{}"]).await;
        let res = app
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({"ok": true, "store_ok": true, "llm": []})
        );
    }
}
