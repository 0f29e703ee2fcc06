use serde::{Deserialize, Serialize};

/// Request payload for /query.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Question in plain language, e.g. "users older than 30".
    pub natural_query: String,
    /// Target collection; the configured default when omitted.
    #[serde(default)]
    pub collection: Option<String>,
}

/// Response payload for /query.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Pretty JSON array of matching documents, or an error message.
    pub result: String,
}
