use axum::http::Extensions;
use serde::Serialize;
use serde_json::{Map, Value};

/// An incoming query before translation.
///
/// `params` is the decoded dialect (`{"age": {"$gt": "18"}, "$limit": "10"}`), in
/// insertion order. `extensions` carries typed metadata attached by the caller; it is
/// copied through sanitization untouched and never read by the translation layer.
#[derive(Debug, Clone, Default)]
pub struct RawQuery {
    pub params: Map<String, Value>,
    pub extensions: Extensions,
}

impl RawQuery {
    #[must_use]
    pub fn new(params: Map<String, Value>) -> Self {
        Self {
            params,
            extensions: Extensions::new(),
        }
    }

    /// Build from a JSON value; anything but an object yields an empty query.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(params) => Self::new(params),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// `$paginate` set to `false` or `"false"`.
    #[must_use]
    pub fn is_pagination_disabled(&self) -> bool {
        matches!(self.params.get("$paginate"), Some(Value::Bool(false)))
            || matches!(self.params.get("$paginate"), Some(Value::String(s)) if s == "false")
    }

    /// The non-`$` entries, i.e. the data-field conditions.
    #[must_use]
    pub fn field_conditions(&self) -> Self {
        let params = self
            .params
            .iter()
            .filter(|(key, _)| !key.starts_with('$'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            params,
            extensions: self.extensions.clone(),
        }
    }
}

impl From<Map<String, Value>> for RawQuery {
    fn from(params: Map<String, Value>) -> Self {
        Self::new(params)
    }
}

/// Response envelope for paginated reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub total: u64,
    #[serde(rename = "$limit")]
    pub limit: u64,
    #[serde(rename = "$skip")]
    pub skip: u64,
    pub data: Vec<T>,
}

/// Result of [`Resource::find`](crate::Resource::find): a page, or every matching row
/// when `$paginate=false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindResult {
    Paginated(Paginated<Value>),
    All(Vec<Value>),
}

impl FindResult {
    /// The rows, whichever shape the result has.
    #[must_use]
    pub fn data(&self) -> &[Value] {
        match self {
            Self::Paginated(page) => &page.data,
            Self::All(rows) => rows,
        }
    }
}
