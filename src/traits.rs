use crate::errors::ApiError;
use crate::filtering::{
    FilterQuery, FilterQueryOptions, apply_filters_to_query_builder, apply_query, filter_query,
    nestify,
};
use crate::models::{FindResult, Paginated, RawQuery};
use crate::options::{OperationOptions, QueryOptions};
use crate::query_builder::{Clause, Comparison, QueryBuilder, Value, bind_value, value_label};
use crate::service;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    RelationDef, TransactionTrait,
};
use serde_json::Value as Json;

/// How a joined relation is folded into its parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Object, or `null` when nothing matched.
    One,
    /// Array, possibly empty.
    Many,
}

/// A relation `$relations` may name.
#[derive(Debug)]
pub struct RelationSpec {
    /// Join from the resource's table to the related one.
    pub def: RelationDef,
    /// Related columns to project.
    pub columns: Vec<&'static str>,
    pub kind: RelationKind,
}

impl RelationSpec {
    pub fn one(def: RelationDef, columns: Vec<&'static str>) -> Self {
        Self {
            def,
            columns,
            kind: RelationKind::One,
        }
    }

    pub fn many(def: RelationDef, columns: Vec<&'static str>) -> Self {
        Self {
            def,
            columns,
            kind: RelationKind::Many,
        }
    }
}

/// An entity the query dialect can be run against.
///
/// ```rust,ignore
/// pub struct Users;
///
/// impl Queryable for Users {
///     type Entity = user::Entity;
///     const RESOURCE_NAME: &'static str = "User";
///
///     fn relation(name: &str) -> Option<RelationSpec> {
///         match name {
///             "addresses" => Some(RelationSpec::many(
///                 user::Relation::Addresses.def(),
///                 vec!["id", "user_id", "city"],
///             )),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Queryable: Sized + Send + Sync + 'static {
    type Entity: EntityTrait<Model: Sync>;

    /// Used in error messages and logs.
    const RESOURCE_NAME: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    /// Relation joined for a `$relations` entry. `None` rejects the name.
    #[must_use]
    fn relation(name: &str) -> Option<RelationSpec> {
        let _ = name;
        None
    }

    #[must_use]
    fn query_options() -> QueryOptions {
        QueryOptions::default()
    }
}

fn with_soft_delete_filter(mut query: RawQuery, options: &QueryOptions) -> RawQuery {
    if let Some(key) = &options.delete_key {
        query.params.insert(key.clone(), Json::Bool(false));
    }
    query
}

/// Service operations over a [`Queryable`] resource. Every method has a default
/// implementation; implementors only pick the active model type and the mode constants.
#[async_trait]
pub trait Resource: Queryable
where
    <Self::Entity as EntityTrait>::Model: IntoActiveModel<Self::ActiveModelType>,
{
    type ActiveModelType: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + Send
        + Sync;

    /// Bulk create and bulk remove.
    const MULTI: bool = false;
    /// Removal flips `delete_key` instead of deleting, when `delete_key` is configured.
    const SOFT_DELETE: bool = true;

    /// Run a dialect query. Returns the pagination envelope, or every matching row
    /// when `$paginate` is `false`.
    async fn find(
        db: &DatabaseConnection,
        query: RawQuery,
        options: OperationOptions,
    ) -> Result<FindResult, ApiError> {
        options.require_soft_delete_mode("find")?;
        let settings = Self::query_options();
        let query = with_soft_delete_filter(query, &settings);
        let FilterQuery { filters, query } =
            filter_query(&query, &FilterQueryOptions::service_defaults())?;

        let mut builder = QueryBuilder::<Self>::new();
        apply_filters_to_query_builder(&mut builder, &filters, &query);
        nestify(&mut builder, &filters, &settings, true, false);

        if query.is_pagination_disabled() {
            return Ok(FindResult::All(builder.get_many(db).await?));
        }

        let limit = filters
            .limit()
            .filter(|limit| *limit > 0)
            .unwrap_or(settings.default_limit);
        let skip = filters
            .skip()
            .filter(|skip| *skip > 0)
            .unwrap_or(settings.default_skip);

        let mut counter = builder.clone();
        counter.skip(0).take(0);
        builder.skip(skip).take(limit);

        let (data, total) = tokio::try_join!(builder.get_many(db), counter.get_count(db))?;
        tracing::debug!(
            resource = Self::RESOURCE_NAME,
            total,
            limit,
            skip,
            "Paginated find"
        );
        Ok(FindResult::Paginated(Paginated {
            total,
            limit,
            skip,
            data,
        }))
    }

    /// One record by primary key, further narrowed by plain equality on the query's
    /// data fields. `Ok(None)` when nothing matches.
    async fn get(
        db: &DatabaseConnection,
        id: Value,
        query: RawQuery,
        options: OperationOptions,
    ) -> Result<Option<Json>, ApiError> {
        options.require_soft_delete_mode("get")?;
        let settings = Self::query_options();
        let query = with_soft_delete_filter(query, &settings);
        let FilterQuery { filters, query } =
            filter_query(&query, &FilterQueryOptions::service_defaults())?;

        let mut builder = QueryBuilder::<Self>::new();
        builder.and_where(Clause::compare(Self::PRIMARY_KEY, Comparison::Eq, id, "id"));
        for (key, value) in &query.field_conditions().params {
            builder.and_where(Clause::compare(
                key.as_str(),
                Comparison::Eq,
                bind_value(value),
                key.as_str(),
            ));
        }
        nestify(&mut builder, &filters, &settings, true, false);
        builder.get_one(db).await
    }

    /// Insert one object, or with `multi` (default [`Self::MULTI`]) an array of objects
    /// in one transaction. Returns the stored record(s).
    async fn create(
        db: &DatabaseConnection,
        data: Json,
        multi: Option<bool>,
    ) -> Result<Json, ApiError> {
        match (multi.unwrap_or(Self::MULTI), data) {
            (true, Json::Array(items)) => {
                let txn = db.begin().await?;
                let mut created = Vec::with_capacity(items.len());
                for item in &items {
                    created.push(service::insert_record::<Self, _>(&txn, item).await?);
                }
                txn.commit().await?;
                tracing::info!(
                    resource = Self::RESOURCE_NAME,
                    count = created.len(),
                    "Created records"
                );
                Ok(Json::Array(created))
            }
            (true, _) => Err(ApiError::invalid_payload_shape(
                "Bulk creation requires an array of objects.",
            )),
            (false, Json::Array(_)) => Err(ApiError::invalid_payload_shape(
                "Single creation expects a single object, not an array.",
            )),
            (false, item) => service::insert_record::<Self, _>(db, &item).await,
        }
    }

    /// Update by primary key and return the re-read record (`null` when it is gone),
    /// or with `id = None` update every row matching the query's predicates (`$or` and
    /// `$regex` included) and return those rows as they are after the update.
    async fn patch(
        db: &DatabaseConnection,
        id: Option<Value>,
        data: Json,
        query: RawQuery,
        options: OperationOptions,
    ) -> Result<Json, ApiError> {
        options.require_soft_delete_mode("patch")?;
        let settings = Self::query_options();
        let query = with_soft_delete_filter(query, &settings);
        let FilterQuery { filters, query } =
            filter_query(&query, &FilterQueryOptions::service_defaults())?;
        let Json::Object(changes) = &data else {
            return Err(ApiError::invalid_payload_shape(
                "Patch expects a single object.",
            ));
        };

        if let Some(id) = id {
            let mut builder = QueryBuilder::<Self>::new();
            builder.and_where(Clause::compare(Self::PRIMARY_KEY, Comparison::Eq, id, "id"));
            service::update_matching(db, &builder, changes).await?;

            nestify(&mut builder, &filters, &settings, true, false);
            return Ok(builder.get_one(db).await?.unwrap_or(Json::Null));
        }

        let mut target = QueryBuilder::<Self>::new();
        apply_query(&mut target, &query);
        let keys = service::matching_keys(db, &target).await?;
        service::update_matching(db, &target, changes).await?;
        if keys.is_empty() {
            return Ok(Json::Array(Vec::new()));
        }

        let mut builder = QueryBuilder::<Self>::new();
        builder.and_where(Clause::is_in(Self::PRIMARY_KEY, keys, "id"));
        nestify(&mut builder, &filters, &settings, true, false);
        Ok(Json::Array(builder.get_many(db).await?))
    }

    /// Remove by primary key (`NotFound` when missing), or with `id = None` and
    /// [`Self::MULTI`] every row matching the query's predicates. Returns what was removed.
    async fn remove(
        db: &DatabaseConnection,
        id: Option<Value>,
        query: RawQuery,
        options: OperationOptions,
    ) -> Result<Json, ApiError> {
        options.require_soft_delete_mode("remove")?;
        let settings = Self::query_options();
        let delete_key = settings.delete_key.as_deref().filter(|_| Self::SOFT_DELETE);

        if let Some(id) = id {
            let record = Self::get(db, id.clone(), query, OperationOptions::default())
                .await?
                .ok_or_else(|| ApiError::not_found(Self::RESOURCE_NAME, Some(value_label(&id))))?;

            let mut target = QueryBuilder::<Self>::new();
            target.and_where(Clause::compare(Self::PRIMARY_KEY, Comparison::Eq, id, "id"));
            service::delete_matching(db, &target, delete_key).await?;
            return Ok(record);
        }

        if !Self::MULTI {
            return Err(ApiError::invalid_payload_shape(
                "Removing by query requires multi mode; pass an id.",
            ));
        }

        let query = with_soft_delete_filter(query, &settings);
        let FilterQuery { query, .. } =
            filter_query(&query, &FilterQueryOptions::service_defaults())?;
        let mut target = QueryBuilder::<Self>::new();
        apply_query(&mut target, &query);
        let removed = target.get_many(db).await?;
        service::delete_matching(db, &target, delete_key).await?;
        tracing::info!(
            resource = Self::RESOURCE_NAME,
            count = removed.len(),
            soft = delete_key.is_some(),
            "Removed records"
        );
        Ok(Json::Array(removed))
    }

    /// Rows matching `filter`'s predicates, excluding soft-deleted ones.
    async fn count(db: &DatabaseConnection, filter: RawQuery) -> Result<u64, ApiError> {
        let filter = with_soft_delete_filter(filter, &Self::query_options());
        let mut builder = QueryBuilder::<Self>::new();
        apply_query(&mut builder, &filter);
        builder.get_count(db).await
    }
}
