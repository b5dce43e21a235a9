use crate::models::RawQuery;
use crate::query_builder::{Clause, Comparison, QueryBuilder, bind_list, bind_value};
use serde_json::{Map, Value};

fn comparison(operator: &str) -> Option<(Comparison, &'static str)> {
    Some(match operator {
        "$lt" => (Comparison::Lt, "lt"),
        "$lte" => (Comparison::Lte, "lte"),
        "$gt" => (Comparison::Gt, "gt"),
        "$gte" => (Comparison::Gte, "gte"),
        "$ne" => (Comparison::Ne, "ne"),
        _ => return None,
    })
}

fn apply_operators<R>(builder: &mut QueryBuilder<R>, field: &str, operators: &Map<String, Value>) {
    for (operator, value) in operators {
        match operator.as_str() {
            "$in" => {
                builder.and_where(Clause::is_in(field, bind_list(value), field));
            }
            "$nin" => {
                builder.and_where(Clause::not_in(field, bind_list(value), format!("{field}_nin")));
            }
            other => match comparison(other) {
                Some((comparison, suffix)) => {
                    builder.and_where(Clause::compare(
                        field,
                        comparison,
                        bind_value(value),
                        format!("{field}_{suffix}"),
                    ));
                }
                None => {
                    tracing::debug!(field, operator = other, "Ignoring unrecognised field operator");
                }
            },
        }
    }
}

/// First entry of the `$regex` object becomes a substring match.
fn apply_regex<R>(builder: &mut QueryBuilder<R>, value: &Value) {
    let Some((field, pattern)) = value.as_object().and_then(|fields| fields.iter().next()) else {
        tracing::debug!("Ignoring $regex without a field");
        return;
    };
    let pattern = match pattern {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    builder.and_where(Clause::like(
        field.as_str(),
        format!("%{pattern}%"),
        format!("{field}Pattern"),
    ));
}

fn apply_or<R>(builder: &mut QueryBuilder<R>, clauses: &[Value]) {
    for (index, clause) in clauses.iter().enumerate() {
        match clause {
            Value::Object(fields) if !fields.is_empty() => {
                let branch = fields
                    .iter()
                    .map(|(field, value)| {
                        Clause::compare(
                            field.as_str(),
                            Comparison::Eq,
                            bind_value(value),
                            format!("{field}_{index}"),
                        )
                    })
                    .collect();
                builder.or_where(branch);
            }
            _ => tracing::debug!(index, "Skipping $or clause that is not a non-empty object"),
        }
    }
}

/// Compile the query's predicates into the builder's where-clause.
///
/// Plain fields become equality, operator objects become one predicate per operator,
/// `$regex` becomes a `LIKE`, and the `$or` branches form one OR group AND-ed with the
/// rest. Other `$` keys are not predicates and are skipped.
pub fn apply_query<'b, R>(builder: &'b mut QueryBuilder<R>, query: &RawQuery) -> &'b mut QueryBuilder<R> {
    for (key, value) in &query.params {
        match key.as_str() {
            "$regex" => apply_regex(builder, value),
            "$or" => match value {
                Value::Array(clauses) => apply_or(builder, clauses),
                _ => tracing::debug!("Ignoring $or that is not an array"),
            },
            meta if meta.starts_with('$') => {
                tracing::trace!(key = meta, "Meta-key has no predicate form");
            }
            field => match value {
                Value::Object(operators) => apply_operators(builder, field, operators),
                other => {
                    builder.and_where(Clause::compare(
                        field,
                        Comparison::Eq,
                        bind_value(other),
                        field,
                    ));
                }
            },
        }
    }
    builder
}
