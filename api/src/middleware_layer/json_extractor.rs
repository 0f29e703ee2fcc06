//! Rewrites 400/422 responses into `{detail, hint?}` JSON with an
//! `X-Request-Id` header.
//!
//! Axum's JSON extractor rejects bodies with plain-text messages; clients of
//! this API always get JSON instead. Bodies that already carry a `detail`
//! field (our own [`crate::error_handler::AppError`]) are passed through.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Serialize)]
struct RejectionBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn hint_for(msg: &str) -> Option<&'static str> {
    if msg.contains("missing field") {
        Some("A required field is missing, e.g. {\"natural_query\": \"...\"}.")
    } else if msg.contains("expected a string") || msg.contains("expected a borrowed string") {
        Some("Expected a JSON string here (e.g. \"users older than 30\").")
    } else if msg.contains("expected a map") || msg.contains("expected struct") {
        Some("Expected a JSON object here (e.g. { \"field\": \"value\" }).")
    } else if msg.contains("Content-Type") {
        Some("Send the body with `Content-Type: application/json`.")
    } else {
        None
    }
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) -> String {
    if let Some(v) = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        return v.to_string();
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let id = format!("req-{nanos}");
    if let Ok(value) = HeaderValue::from_str(&id) {
        parts.headers.insert(REQUEST_ID_HEADER, value);
    }
    id
}

fn has_detail(bytes: &[u8]) -> bool {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .is_some_and(|v| v.get("detail").is_some())
}

pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if !(status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY) {
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    let req_id = ensure_request_id(&mut parts);

    if has_detail(&bytes) {
        return Response::from_parts(parts, bytes.into());
    }

    let original = String::from_utf8_lossy(&bytes);
    debug!(request_id = %req_id, status = status.as_u16(), "rejected request body");
    let body = RejectionBody {
        detail: original.trim().to_string(),
        hint: hint_for(&original),
    };
    let body = match serde_json::to_vec(&body) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_follow_serde_messages() {
        assert!(hint_for("missing field `natural_query` at line 1").is_some());
        assert!(hint_for("Expected request with `Content-Type: application/json`").is_some());
        assert!(hint_for("something else").is_none());
    }

    #[test]
    fn detail_bodies_are_recognized() {
        assert!(has_detail(br#"{"detail":"x","code":"BAD_REQUEST"}"#));
        assert!(!has_detail(b"Failed to parse the request body as JSON"));
    }
}
