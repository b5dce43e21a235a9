use sea_orm::ColumnType;
use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use serde_json::Value as Json;

pub use sea_orm::Value;

/// Binary comparison of a column against one bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseKind {
    Compare(Comparison, Value),
    Like(String),
    In(Vec<Value>),
    NotIn(Vec<Value>),
}

/// One parameterised predicate on a field.
///
/// `param` is the diagnostic name of the bound value (`age_gt`, `namePattern`,
/// `name_0`); values themselves are always bound positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub param: String,
    pub kind: ClauseKind,
}

impl Clause {
    pub fn compare(
        field: impl Into<String>,
        comparison: Comparison,
        value: Value,
        param: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            param: param.into(),
            kind: ClauseKind::Compare(comparison, value),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            param: param.into(),
            kind: ClauseKind::Like(pattern.into()),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>, param: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            param: param.into(),
            kind: ClauseKind::In(values),
        }
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>, param: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            param: param.into(),
            kind: ClauseKind::NotIn(values),
        }
    }

    /// `column_type`, when known, is used to bind textual values with the column's type.
    pub(crate) fn to_expr(
        &self,
        table: &str,
        column: &str,
        column_type: Option<&ColumnType>,
    ) -> SimpleExpr {
        let col = Expr::col((Alias::new(table), Alias::new(column)));
        let fit = |value: &Value| fit_to_column(value, column_type);
        let fit_all = |values: &[Value]| values.iter().map(fit).collect::<Vec<_>>();
        match &self.kind {
            ClauseKind::Compare(Comparison::Eq, value) => col.eq(fit(value)),
            ClauseKind::Compare(Comparison::Ne, value) => col.ne(fit(value)),
            ClauseKind::Compare(Comparison::Lt, value) => col.lt(fit(value)),
            ClauseKind::Compare(Comparison::Lte, value) => col.lte(fit(value)),
            ClauseKind::Compare(Comparison::Gt, value) => col.gt(fit(value)),
            ClauseKind::Compare(Comparison::Gte, value) => col.gte(fit(value)),
            ClauseKind::Like(pattern) => col.like(pattern.clone()),
            ClauseKind::In(values) => col.is_in(fit_all(values)),
            ClauseKind::NotIn(values) => col.is_not_in(fit_all(values)),
        }
    }
}

/// Numeric and boolean text (`"18"`, `"false"`) bound as a number or bool when the
/// column has that type. Anything that does not parse is bound unchanged.
fn fit_to_column(value: &Value, column_type: Option<&ColumnType>) -> Value {
    let (Some(column_type), Value::String(Some(text))) = (column_type, value) else {
        return value.clone();
    };
    let text = text.trim();
    let fitted = match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => text.parse::<i64>().ok().map(|i| Value::BigInt(Some(i))),
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => {
            text.parse::<f64>().ok().map(|f| Value::Double(Some(f)))
        }
        ColumnType::Boolean => match text {
            "true" => Some(Value::Bool(Some(true))),
            "false" => Some(Value::Bool(Some(false))),
            _ => None,
        },
        _ => None,
    };
    fitted.unwrap_or_else(|| value.clone())
}

/// Where-clause entry: AND-ed directly, or one OR branch whose clauses are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Clause),
    Or(Vec<Clause>),
}

/// Bind a JSON query value as a SQL parameter.
///
/// Strings stay strings; the database coerces them against the column type.
/// Arrays and objects are bound as JSON.
#[must_use]
pub fn bind_value(value: &Json) -> Value {
    match value {
        Json::Null => Value::String(None),
        Json::Bool(b) => Value::Bool(Some(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::BigInt(Some(i))
            } else if n.is_u64() {
                // Above i64::MAX; drivers bind integers as i64
                Value::String(Some(Box::new(n.to_string())))
            } else {
                Value::Double(n.as_f64())
            }
        }
        Json::String(s) => Value::String(Some(Box::new(s.clone()))),
        Json::Array(_) | Json::Object(_) => Value::Json(Some(Box::new(value.clone()))),
    }
}

/// `$in`/`$nin` operand: an array binds element-wise, a scalar becomes a one-element list.
#[must_use]
pub fn bind_list(value: &Json) -> Vec<Value> {
    match value {
        Json::Array(items) => items.iter().map(bind_value).collect(),
        other => vec![bind_value(other)],
    }
}

/// Readable form of a bound value, for messages.
#[must_use]
pub fn value_label(value: &Value) -> String {
    match value {
        Value::TinyInt(Some(v)) => v.to_string(),
        Value::SmallInt(Some(v)) => v.to_string(),
        Value::Int(Some(v)) => v.to_string(),
        Value::BigInt(Some(v)) => v.to_string(),
        Value::TinyUnsigned(Some(v)) => v.to_string(),
        Value::SmallUnsigned(Some(v)) => v.to_string(),
        Value::Unsigned(Some(v)) => v.to_string(),
        Value::BigUnsigned(Some(v)) => v.to_string(),
        Value::String(Some(v)) => v.to_string(),
        Value::Json(Some(v)) => v.to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_scalars() {
        assert_eq!(bind_value(&json!(18)), Value::BigInt(Some(18)));
        assert_eq!(bind_value(&json!(1.5)), Value::Double(Some(1.5)));
        assert_eq!(bind_value(&json!(true)), Value::Bool(Some(true)));
        assert_eq!(
            bind_value(&json!("18")),
            Value::String(Some(Box::new("18".to_string())))
        );
        assert_eq!(bind_value(&json!(null)), Value::String(None));
    }

    #[test]
    fn test_bind_integer_beyond_i64_as_text() {
        assert_eq!(
            bind_value(&json!(u64::MAX)),
            Value::String(Some(Box::new(u64::MAX.to_string())))
        );
    }

    #[test]
    fn test_bind_array_as_json() {
        assert_eq!(
            bind_value(&json!(["a", "b"])),
            Value::Json(Some(Box::new(json!(["a", "b"]))))
        );
    }

    #[test]
    fn test_bind_list() {
        assert_eq!(
            bind_list(&json!([1, 2])),
            vec![Value::BigInt(Some(1)), Value::BigInt(Some(2))]
        );
        assert_eq!(bind_list(&json!(3)), vec![Value::BigInt(Some(3))]);
        assert!(bind_list(&json!([])).is_empty());
    }

    #[test]
    fn test_value_label() {
        assert_eq!(value_label(&Value::Int(Some(3))), "3");
        assert_eq!(value_label(&bind_value(&json!("abc"))), "abc");
    }

    #[test]
    fn test_text_fitted_to_column_type() {
        let text = |s: &str| Value::String(Some(Box::new(s.to_string())));
        assert_eq!(
            fit_to_column(&text("18"), Some(&ColumnType::Integer)),
            Value::BigInt(Some(18))
        );
        assert_eq!(
            fit_to_column(&text("2.5"), Some(&ColumnType::Double)),
            Value::Double(Some(2.5))
        );
        assert_eq!(
            fit_to_column(&text("false"), Some(&ColumnType::Boolean)),
            Value::Bool(Some(false))
        );
        assert_eq!(fit_to_column(&text("abc"), Some(&ColumnType::Integer)), text("abc"));
        assert_eq!(fit_to_column(&text("18"), Some(&ColumnType::Text)), text("18"));
        assert_eq!(fit_to_column(&text("18"), None), text("18"));
    }

    #[test]
    fn test_comparison_sql() {
        assert_eq!(Comparison::Gte.sql(), ">=");
        assert_eq!(Comparison::Ne.sql(), "!=");
    }
}
