//! Applying extracted filters to a [`QueryBuilder`].

use super::filters::Filters;
use super::operators::SortSpec;
use super::predicates::apply_query;
use crate::models::RawQuery;
use crate::options::QueryOptions;
use crate::query_builder::QueryBuilder;
use serde_json::Value;

/// Loose truthiness of a supplied filter value: `null`, `false`, `0`, `NaN` and `""`
/// are false; any other string (including `"0"` and `"false"`) and every array or
/// object is true.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn field_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field names from `$select`: an array of names, a single name, or an object whose
/// keys with truthy values are selected.
fn selection_fields(select: &Value) -> Vec<String> {
    match select {
        Value::Array(items) => items.iter().filter_map(field_name).collect(),
        Value::Object(fields) => fields
            .iter()
            .filter(|(_, include)| is_truthy(include))
            .map(|(field, _)| field.clone())
            .collect(),
        other => field_name(other).into_iter().collect(),
    }
}

fn relation_names(relations: &Value) -> Vec<String> {
    match relations {
        Value::Array(items) => items.iter().filter_map(field_name).collect(),
        other => field_name(other).into_iter().collect(),
    }
}

fn join_relations<R>(builder: &mut QueryBuilder<R>, relations: &Value) {
    let alias = builder.alias().to_string();
    for relation in relation_names(relations) {
        builder.left_join_and_select(format!("{alias}.{relation}"), relation);
    }
}

fn apply_sort<R>(builder: &mut QueryBuilder<R>, sort: Option<&SortSpec>, prefix: Option<&str>) {
    match sort {
        Some(SortSpec::Fields(fields)) => {
            for (field, direction) in fields {
                let path = match prefix {
                    Some(alias) => format!("{alias}.{field}"),
                    None => field.clone(),
                };
                builder.add_order_by(path, direction.order());
            }
        }
        Some(SortSpec::Raw(raw)) => {
            tracing::debug!(sort = %raw, "Ignoring $sort that is not an object");
        }
        None => {}
    }
}

/// Apply projection, relations, ordering and pagination to `builder`.
///
/// - `$select` fields are qualified with the builder's alias.
/// - `$relations` are joined only when `options.default_pagination` is set.
/// - Unless pagination is disabled or this is a single operation, `skip`/`take` come
///   from the filters, falling back to the option defaults when missing, zero or
///   not a number.
pub fn nestify<'b, R>(
    builder: &'b mut QueryBuilder<R>,
    filters: &Filters,
    options: &QueryOptions,
    is_single_operation: bool,
    is_pagination_disabled: bool,
) -> &'b mut QueryBuilder<R> {
    let alias = builder.alias().to_string();

    if let Some(select) = &filters.select {
        let fields = selection_fields(select);
        builder.select(fields.iter().map(|field| format!("{alias}.{field}")));
    }

    if options.default_pagination
        && let Some(relations) = filters.relations.as_ref().filter(|value| is_truthy(value))
    {
        join_relations(builder, relations);
    }

    apply_sort(builder, filters.sort.as_ref(), Some(&alias));

    if !is_pagination_disabled && !is_single_operation {
        let take = filters
            .limit()
            .filter(|limit| *limit > 0)
            .unwrap_or(options.default_limit);
        let skip = filters
            .skip()
            .filter(|skip| *skip > 0)
            .unwrap_or(options.default_skip);
        builder.take(take).skip(skip);
    }

    builder
}

/// Apply the filters as given (no defaults), then compile the query's predicates.
pub fn apply_filters_to_query_builder<'b, R>(
    builder: &'b mut QueryBuilder<R>,
    filters: &Filters,
    query: &RawQuery,
) -> &'b mut QueryBuilder<R> {
    if let Some(skip) = filters.skip() {
        builder.skip(skip);
    }
    if let Some(limit) = filters.limit() {
        builder.take(limit);
    }

    apply_sort(builder, filters.sort.as_ref(), None);

    if let Some(select) = filters.select.as_ref().filter(|value| is_truthy(value)) {
        builder.select(selection_fields(select));
    }

    if let Some(relations) = filters.relations.as_ref().filter(|value| is_truthy(value)) {
        join_relations(builder, relations);
    }

    apply_query(builder, query)
}
