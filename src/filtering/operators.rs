//! The operator table: the five `$` meta-keys the filter extractor recognises and
//! the converters that normalise their raw values.

use crate::options::PaginatePolicy;
use sea_orm::sea_query::Order;
use serde_json::Value;

/// Field-level and predicate-level operators accepted by the sanitizer.
pub const OPERATORS: [&str; 8] = ["$in", "$nin", "$lt", "$lte", "$gt", "$gte", "$ne", "$or"];

/// Recognised meta-keys, in the order the extractor visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Sort,
    Limit,
    Skip,
    Select,
    Relations,
}

impl FilterKey {
    pub const ALL: [Self; 5] = [
        Self::Sort,
        Self::Limit,
        Self::Skip,
        Self::Select,
        Self::Relations,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sort => "$sort",
            Self::Limit => "$limit",
            Self::Skip => "$skip",
            Self::Select => "$select",
            Self::Relations => "$relations",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.as_str() == key)
    }
}

/// Outcome of the integer parse used by `$limit` and `$skip`.
///
/// A key that was supplied but does not parse is still a recognised filter, so
/// the sanitizer accepts it and the composer falls back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedInt {
    Value(u64),
    NotANumber,
}

impl ParsedInt {
    #[must_use]
    pub const fn value(self) -> Option<u64> {
        match self {
            Self::Value(n) => Some(n),
            Self::NotANumber => None,
        }
    }
}

/// Leading-integer parse: optional whitespace and sign, then decimal digits up to
/// the first non-digit. Returns `(negative, magnitude)`; saturates on overflow.
fn leading_int(input: &str) -> Option<(bool, u64)> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].bytes().fold(0u64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(u64::from(digit - b'0'))
    });
    Some((negative, magnitude))
}

fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| text_form(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_float(f: f64) -> (bool, u64) {
    (f < 0.0, f.trunc().abs() as u64)
}

fn signed_int(value: &Value) -> Option<(bool, u64)> {
    if let Value::Number(n) = value {
        if let Some(unsigned) = n.as_u64() {
            return Some((false, unsigned));
        }
        if let Some(signed) = n.as_i64() {
            return Some((signed < 0, signed.unsigned_abs()));
        }
        return n.as_f64().filter(|f| f.is_finite()).map(truncate_float);
    }
    text_form(value).and_then(|text| leading_int(&text))
}

/// Largest row count or offset a database driver can bind.
pub const MAX_ROWS: u64 = i64::MAX.unsigned_abs();

/// Absolute integer value of a raw `$limit`/`$skip`, capped at [`MAX_ROWS`]; `None`
/// when the key is absent.
#[must_use]
pub fn parse_int(value: Option<&Value>) -> Option<ParsedInt> {
    let value = value?;
    Some(signed_int(value).map_or(ParsedInt::NotANumber, |(_, magnitude)| {
        ParsedInt::Value(magnitude.min(MAX_ROWS))
    }))
}

/// Apply a pagination policy to a parsed `$limit`.
///
/// With a non-zero `policy.default`, the result is the requested limit (or the default
/// when missing or unparsable) capped at `policy.max`. Without one, the limit passes
/// through unchanged.
#[must_use]
pub fn get_limit(limit: Option<ParsedInt>, policy: Option<&PaginatePolicy>) -> Option<ParsedInt> {
    if let Some(policy) = policy
        && let Some(default) = policy.default.filter(|d| *d > 0)
    {
        let lower = match limit {
            Some(ParsedInt::Value(requested)) => requested,
            _ => default,
        };
        let upper = policy.max.unwrap_or(MAX_ROWS);
        return Some(ParsedInt::Value(lower.min(upper).min(MAX_ROWS)));
    }
    limit
}

/// Direction of one `$sort` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
    /// A non-numeric direction kept as supplied (e.g. `"desc"` or a nested object).
    Other(Value),
}

impl SortDirection {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(_) | Value::Bool(true) => Self::Other(value.clone()),
            Value::String(_) | Value::Array(_) | Value::Number(_) => match signed_int(value) {
                Some((true, 1)) => Self::Desc,
                Some(_) => Self::Asc,
                None => Self::Other(value.clone()),
            },
            Value::Bool(false) | Value::Null => Self::Asc,
        }
    }

    /// Order used when the builder is compiled. Pass-through strings spelling a
    /// direction are honoured, anything else sorts ascending.
    #[must_use]
    pub fn order(&self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
            Self::Other(Value::String(s)) if s.eq_ignore_ascii_case("desc") => Order::Desc,
            Self::Other(other) => {
                tracing::debug!(direction = %other, "Unrecognised sort direction, using ASC");
                Order::Asc
            }
        }
    }
}

/// Converted `$sort`.
#[derive(Debug, Clone, PartialEq)]
pub enum SortSpec {
    /// Field to direction, in the order supplied.
    Fields(Vec<(String, SortDirection)>),
    /// Non-object input, passed through unchanged.
    Raw(Value),
}

/// `{age: -1, name: 1}` becomes `[(age, Desc), (name, Asc)]`.
#[must_use]
pub fn convert_sort(value: &Value) -> SortSpec {
    match value {
        Value::Object(fields) => SortSpec::Fields(
            fields
                .iter()
                .map(|(field, direction)| (field.clone(), SortDirection::from_value(direction)))
                .collect(),
        ),
        other => SortSpec::Raw(other.clone()),
    }
}
