//! Query descriptor model: what the generation backend is asked to produce.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::QueryError;

/// A generic string-keyed record. Key order is preserved.
pub type Document = Map<String, Value>;

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// MongoDB numeric form: `1` or `-1`.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }

    /// Accepts `1`/`-1` and `asc`/`ascending`/`desc`/`descending` (any case).
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => match n.as_f64()? {
                x if x == 1.0 => Some(Self::Ascending),
                x if x == -1.0 => Some(Self::Descending),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "asc" | "ascending" | "1" => Some(Self::Ascending),
                "desc" | "descending" | "-1" => Some(Self::Descending),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Ordered sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(Vec<(String, SortDirection)>);

impl SortSpec {
    pub fn new(keys: Vec<(String, SortDirection)>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads `{"age": -1, "name": 1}` or `[["age", -1], ["name", 1]]`.
    pub fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Object(map) => map
                .iter()
                .map(|(field, dir)| pair(field, dir))
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            Value::Array(items) => items
                .iter()
                .map(|item| match item.as_array().map(Vec::as_slice) {
                    Some([Value::String(field), dir]) => pair(field, dir),
                    _ => Err(QueryError::invalid(format!(
                        "sort entries must be [field, direction] pairs, got {item}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(QueryError::invalid(format!(
                "'sort' must be an object or a list of pairs, got {other}"
            ))),
        }
    }

    /// Object form, in key order.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(field, dir)| (field.clone(), Value::from(dir.as_i32())))
                .collect(),
        )
    }
}

fn pair(field: &str, dir: &Value) -> Result<(String, SortDirection), QueryError> {
    let dir = SortDirection::from_value(dir).ok_or_else(|| {
        QueryError::invalid(format!("unknown sort direction {dir} for '{field}'"))
    })?;
    Ok((field.to_string(), dir))
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Structured query produced by the generation backend.
///
/// `find` names the collection the backend believes it is querying; the
/// engine overwrites it with the caller's collection before execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    pub find: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

impl QueryDescriptor {
    /// Descriptor matching every document of `collection`.
    pub fn all(collection: impl Into<String>) -> Self {
        Self {
            find: collection.into(),
            filter: None,
            projection: None,
            sort: None,
        }
    }

    /// Validates a parsed JSON value against the descriptor contract.
    ///
    /// `null` for an optional key counts as absent. Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, QueryError> {
        let Value::Object(mut map) = value else {
            return Err(QueryError::invalid("expected a JSON object"));
        };

        let find = match map.remove("find") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::String(_)) => return Err(QueryError::invalid("'find' is empty")),
            Some(other) => {
                return Err(QueryError::invalid(format!(
                    "'find' must be a string, got {other}"
                )));
            }
            None => return Err(QueryError::invalid("missing 'find'")),
        };

        let filter = object_field(&mut map, "filter")?;
        let projection = object_field(&mut map, "projection")?;
        let sort = match map.remove("sort") {
            None | Some(Value::Null) => None,
            Some(v) => Some(SortSpec::from_value(&v)?),
        };

        Ok(Self {
            find,
            filter,
            projection,
            sort,
        })
    }

    /// JSON object form, with keys in `find, filter, projection, sort` order.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("find".into(), Value::String(self.find.clone()));
        if let Some(f) = &self.filter {
            out.insert("filter".into(), Value::Object(f.clone()));
        }
        if let Some(p) = &self.projection {
            out.insert("projection".into(), Value::Object(p.clone()));
        }
        if let Some(s) = &self.sort {
            out.insert("sort".into(), s.to_value());
        }
        Value::Object(out)
    }

    /// Compact JSON text; feeding it back to [`crate::parse`] yields `self`.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

fn object_field(map: &mut Document, key: &str) -> Result<Option<Document>, QueryError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(other) => Err(QueryError::invalid(format!(
            "'{key}' must be an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_accepts_object_and_pairs_in_order() {
        let from_obj = SortSpec::from_value(&json!({"age": -1, "name": "asc"})).unwrap();
        let from_pairs = SortSpec::from_value(&json!([["age", "desc"], ["name", 1]])).unwrap();
        assert_eq!(from_obj, from_pairs);
        assert_eq!(
            from_obj.keys(),
            &[
                ("age".to_string(), SortDirection::Descending),
                ("name".to_string(), SortDirection::Ascending)
            ]
        );
        assert_eq!(from_obj.to_value().to_string(), r#"{"age":-1,"name":1}"#);
    }

    #[test]
    fn sort_rejects_unknown_direction() {
        let err = SortSpec::from_value(&json!({"age": 2})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidDescriptor(_)));
    }

    #[test]
    fn descriptor_requires_string_find() {
        for bad in [json!({"filter": {}}), json!({"find": 3}), json!({"find": ""})] {
            let err = QueryDescriptor::from_value(bad).unwrap_err();
            assert!(err.to_string().starts_with("Error: invalid query descriptor:"));
        }
    }

    #[test]
    fn descriptor_rejects_non_object_filter_and_ignores_unknown_keys() {
        assert!(QueryDescriptor::from_value(json!({"find": "users", "filter": [1]})).is_err());

        let d = QueryDescriptor::from_value(json!({
            "find": "users",
            "filter": null,
            "limit": 5
        }))
        .unwrap();
        assert_eq!(d, QueryDescriptor::all("users"));
    }
}
