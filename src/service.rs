//! Write paths shared by the [`Resource`] service operations.

use crate::errors::ApiError;
use crate::payload::column_value;
use crate::query_builder::{Clause, Comparison, QueryBuilder, bind_value};
use crate::traits::{Queryable, Resource};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, EntityTrait, IdenStatic,
    IntoActiveModel, Iterable, ModelTrait, QueryFilter,
};
use serde_json::{Map, Value};
use std::str::FromStr;

type ColumnOf<R> = <<R as Queryable>::Entity as EntityTrait>::Column;

fn column_named<R: Queryable>(name: &str) -> Result<ColumnOf<R>, ApiError> {
    ColumnOf::<R>::from_str(name).map_err(|_| {
        ApiError::internal(
            "Invalid resource configuration",
            Some(format!("{} has no column '{name}'", R::RESOURCE_NAME)),
        )
    })
}

/// Insert one payload object and read it back through the query builder.
pub(crate) async fn insert_record<R, C>(db: &C, payload: &Value) -> Result<Value, ApiError>
where
    R: Resource,
    C: ConnectionTrait,
    <R::Entity as EntityTrait>::Model: IntoActiveModel<R::ActiveModelType>,
{
    let Value::Object(fields) = payload else {
        return Err(ApiError::invalid_payload_shape(
            "Each record must be a JSON object.",
        ));
    };

    let mut active = <R::ActiveModelType as ActiveModelBehavior>::new();
    for column in ColumnOf::<R>::iter() {
        if let Some(raw) = fields.get(column.as_str()) {
            active.set(column, column_value(&column, raw)?);
        }
    }

    let model = active.insert(db).await?;
    let id = model.get(column_named::<R>(R::PRIMARY_KEY)?);

    let mut builder = QueryBuilder::<R>::new();
    builder.and_where(Clause::compare(R::PRIMARY_KEY, Comparison::Eq, id, "id"));
    builder.get_one(db).await?.ok_or_else(|| {
        ApiError::internal(
            "Failed to read back created record",
            Some(format!("{} insert returned no row", R::RESOURCE_NAME)),
        )
    })
}

/// Primary keys of the rows the builder's where-clause matches.
pub(crate) async fn matching_keys<R, C>(
    db: &C,
    target: &QueryBuilder<R>,
) -> Result<Vec<sea_orm::Value>, ApiError>
where
    R: Queryable,
    C: ConnectionTrait,
{
    let mut keys = target.clone();
    keys.select([R::PRIMARY_KEY]);
    Ok(keys
        .get_many(db)
        .await?
        .iter()
        .filter_map(|row| row.get(R::PRIMARY_KEY))
        .map(bind_value)
        .collect())
}

/// Apply `changes` to every row the builder's where-clause matches. The primary key
/// is never updated. Returns the number of affected rows.
pub(crate) async fn update_matching<R, C>(
    db: &C,
    target: &QueryBuilder<R>,
    changes: &Map<String, Value>,
) -> Result<u64, ApiError>
where
    R: Queryable,
    C: ConnectionTrait,
{
    let mut update = R::Entity::update_many();
    let mut touched = false;
    for column in ColumnOf::<R>::iter() {
        if column.as_str() == R::PRIMARY_KEY {
            continue;
        }
        if let Some(raw) = changes.get(column.as_str()) {
            update = update.col_expr(column, Expr::value(column_value(&column, raw)?));
            touched = true;
        }
    }

    if !touched {
        tracing::debug!(resource = R::RESOURCE_NAME, "Patch touches no columns, skipping update");
        return Ok(0);
    }

    let result = update.filter(target.condition()).exec(db).await?;
    Ok(result.rows_affected)
}

/// Delete the rows the builder's where-clause matches, or with a `delete_key` flag
/// them as deleted instead.
pub(crate) async fn delete_matching<R, C>(
    db: &C,
    target: &QueryBuilder<R>,
    delete_key: Option<&str>,
) -> Result<u64, ApiError>
where
    R: Queryable,
    C: ConnectionTrait,
{
    let result = match delete_key {
        Some(key) => {
            R::Entity::update_many()
                .col_expr(column_named::<R>(key)?, Expr::value(true))
                .filter(target.condition())
                .exec(db)
                .await?
                .rows_affected
        }
        None => {
            R::Entity::delete_many()
                .filter(target.condition())
                .exec(db)
                .await?
                .rows_affected
        }
    };
    Ok(result)
}
