//! Conversion of JSON payload fields into typed column values for inserts and updates.

use crate::errors::ApiError;
use sea_orm::{ColumnTrait, ColumnType, Value};
use serde_json::Value as Json;

fn integer<T: TryFrom<i64>>(raw: &Json) -> Option<T> {
    raw.as_i64().and_then(|i| T::try_from(i).ok())
}

fn unsigned<T: TryFrom<u64>>(raw: &Json) -> Option<T> {
    raw.as_u64().and_then(|u| T::try_from(u).ok())
}

/// `Some(None)` for JSON null, `Some(Some(v))` when `parse` succeeds, `None` on mismatch.
fn nullable<T>(raw: &Json, parse: impl FnOnce(&Json) -> Option<T>) -> Option<Option<T>> {
    if raw.is_null() {
        Some(None)
    } else {
        parse(raw).map(Some)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float(raw: &Json) -> Option<f32> {
    raw.as_f64().map(|f| f as f32)
}

fn text(raw: &Json) -> Option<Box<String>> {
    raw.as_str().map(|s| Box::new(s.to_string()))
}

/// `None` when the column type has no JSON mapping or `raw` does not fit it.
fn coerce(column_type: &ColumnType, raw: &Json) -> Option<Value> {
    Some(match column_type {
        ColumnType::TinyInteger => Value::TinyInt(nullable(raw, integer)?),
        ColumnType::SmallInteger => Value::SmallInt(nullable(raw, integer)?),
        ColumnType::Integer => Value::Int(nullable(raw, integer)?),
        ColumnType::BigInteger => Value::BigInt(nullable(raw, integer)?),
        ColumnType::TinyUnsigned => Value::TinyUnsigned(nullable(raw, unsigned)?),
        ColumnType::SmallUnsigned => Value::SmallUnsigned(nullable(raw, unsigned)?),
        ColumnType::Unsigned => Value::Unsigned(nullable(raw, unsigned)?),
        ColumnType::BigUnsigned => Value::BigUnsigned(nullable(raw, unsigned)?),
        ColumnType::Float => Value::Float(nullable(raw, float)?),
        ColumnType::Double => Value::Double(nullable(raw, Json::as_f64)?),
        ColumnType::Boolean => Value::Bool(nullable(raw, Json::as_bool)?),
        ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_) => {
            Value::String(nullable(raw, text)?)
        }
        ColumnType::Json | ColumnType::JsonBinary => {
            Value::Json(nullable(raw, |json| Some(Box::new(json.clone())))?)
        }
        _ => return None,
    })
}

/// Typed value for `column` from a payload field.
///
/// # Errors
///
/// Returns `ApiError::BadRequest` when `raw` is null for a non-nullable column, does not
/// fit the column type, or the column type cannot be written from JSON.
pub fn column_value<C: ColumnTrait>(column: &C, raw: &Json) -> Result<Value, ApiError> {
    let def = column.def();
    let name = column.as_str();

    if raw.is_null() && !def.is_null() {
        return Err(ApiError::bad_request(format!("Field '{name}' cannot be null")));
    }

    coerce(def.get_column_type(), raw).ok_or_else(|| {
        tracing::debug!(field = name, value = %raw, "Payload value does not fit column type");
        ApiError::bad_request(format!("Invalid value for field '{name}'"))
    })
}
