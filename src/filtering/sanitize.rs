use super::filters::Filters;
use crate::errors::ApiError;
use crate::models::RawQuery;
use serde_json::{Map, Value};

struct Sanitizer<'a> {
    operators: &'a [&'a str],
    filters: &'a Filters,
    root: &'a Map<String, Value>,
}

impl Sanitizer<'_> {
    fn allows(&self, key: &str) -> bool {
        !key.starts_with('$') || self.filters.contains(key) || self.operators.contains(&key)
    }

    fn clean_value(&self, value: &Value) -> Result<Value, ApiError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.clean_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => self.clean_map(map).map(Value::Object),
            scalar => Ok(scalar.clone()),
        }
    }

    fn clean_map(&self, map: &Map<String, Value>) -> Result<Map<String, Value>, ApiError> {
        let mut result = Map::with_capacity(map.len());
        for (key, value) in map {
            if !self.allows(key) {
                tracing::warn!(key = %key, "Rejecting query with unknown parameter");
                return Err(ApiError::invalid_query_parameter(
                    key.clone(),
                    Value::Object(self.root.clone()),
                ));
            }
            result.insert(key.clone(), self.clean_value(value)?);
        }
        Ok(result)
    }
}

/// Deep-copy `query`, rejecting any `$` key (at any depth) that is neither in
/// `filters` nor in `operators`. Extensions are carried over as they are.
///
/// # Errors
///
/// Returns `ApiError::InvalidQueryParameter` naming the first offending key.
pub fn clean_query(
    query: &RawQuery,
    operators: &[&str],
    filters: &Filters,
) -> Result<RawQuery, ApiError> {
    let sanitizer = Sanitizer {
        operators,
        filters,
        root: &query.params,
    };
    Ok(RawQuery {
        params: sanitizer.clean_map(&query.params)?,
        extensions: query.extensions.clone(),
    })
}
