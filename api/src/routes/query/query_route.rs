//! POST /query: translates a question into a MongoDB query and runs it.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::info;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::query::query_request::{QueryRequest, QueryResponse},
};

/// Handler: POST /query
///
/// Translation and execution failures are part of a 200 response; only an
/// empty question is rejected.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/query \
///   -H 'content-type: application/json' \
///   -d '{"natural_query":"users older than 30, oldest first"}'
/// ```
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequest>,
) -> AppResult<Json<QueryResponse>> {
    let question = body.natural_query.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("natural_query must not be empty".into()));
    }

    let collection = body
        .collection
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&state.default_collection);

    info!(collection, "query request");
    let result = state.engine.run(question, collection).await;
    Ok(Json(QueryResponse { result }))
}
