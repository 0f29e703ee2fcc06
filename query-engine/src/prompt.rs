//! Instruction template sent to the generation backend.

use serde_json::Value;

use crate::descriptor::Document;

/// Renders the translation prompt.
///
/// The backend is told to answer with a single JSON object whose `find` is
/// exactly `collection`, to keep `$slice` inside the projection, and to
/// express `sort` as ordered `[field, direction]` pairs.
pub fn render(natural_query: &str, sample_doc_info: &str, collection: &str) -> String {
    format!(
        "Below is a sample document from the target NoSQL database collection '{collection}':\n\n\
         {sample_doc_info}\n\n\
         Using the above sample document as a reference for the data structure, \
         convert the following natural language query into a valid MongoDB query in JSON format. \
         The JSON object must include a 'find' key with the exact value '{collection}', \
         a 'filter' key for filtering, and optionally a 'projection' key and a 'sort' key. \
         The 'sort' value must be a list of [field, direction] pairs in priority order, \
         where direction is 1 for ascending or -1 for descending. \
         For array fields, if you want to return only a subset (e.g. the last element), \
         place the $slice operator inside the projection, not in the filter.\n\n\
         Natural Language Query: {natural_query}\n\
         Output only the MongoDB query in JSON format, with all keys quoted, \
         no trailing commas, and no additional text or explanations.\n\n\
         MongoDB Query (in JSON):"
    )
}

/// Pretty-printed (2-space) JSON of the sample document. Never empty.
pub fn describe_sample(sample: &Document) -> String {
    format!("{:#}", Value::Object(sample.clone()))
}

/// Pretty-printed JSON array of results; `[]` when empty.
pub fn render_results(docs: Vec<Document>) -> String {
    format!(
        "{:#}",
        Value::Array(docs.into_iter().map(Value::Object).collect())
    )
}
