use super::hydrate::hydrate;
use super::{Join, QueryBuilder, bind_value, column_ref};
use crate::errors::ApiError;
use crate::traits::{Queryable, RelationKind, RelationSpec};
use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{
    ConnectionTrait, DbBackend, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Select,
};
use serde_json::Value;

const ROOT_KEY: &str = "__root_pk";

impl<R: Queryable> QueryBuilder<R> {
    fn relation_spec(join: &Join) -> Result<RelationSpec, ApiError> {
        R::relation(&join.relation)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown relation: {}", join.relation)))
    }

    /// Entity select with the joins and the where-clause applied.
    fn base(&self) -> Result<Select<R::Entity>, ApiError> {
        let mut select = R::Entity::find();
        for join in &self.joins {
            let spec = Self::relation_spec(join)?;
            select = select.join_as(JoinType::LeftJoin, spec.def, Alias::new(join.alias.as_str()));
        }
        Ok(select.filter(self.condition()))
    }

    fn project(&self, mut select: Select<R::Entity>) -> Result<Select<R::Entity>, ApiError> {
        if let Some(fields) = &self.selection {
            select = select.select_only();
            for field in fields {
                let (_, column) = self.resolve(field);
                select = select.column_as(self.column_expr(field), column);
            }
            // Joined rows are grouped on the root key
            let has_root_key = fields.iter().any(|field| self.resolve(field).1 == R::PRIMARY_KEY);
            if !self.joins.is_empty() && !has_root_key {
                select = select.column_as(column_ref(&self.alias, R::PRIMARY_KEY), R::PRIMARY_KEY);
            }
        }
        for join in &self.joins {
            let spec = Self::relation_spec(join)?;
            for column in &spec.columns {
                select = select.column_as(
                    column_ref(&join.alias, column),
                    format!("{}.{column}", join.alias),
                );
            }
        }
        Ok(select)
    }

    fn ordered(&self, mut select: Select<R::Entity>) -> Select<R::Entity> {
        for (field, order) in &self.order_by {
            select = select.order_by(self.column_expr(field), order.clone());
        }
        select
    }

    fn hydration_plan(&self) -> Result<Vec<(String, RelationKind)>, ApiError> {
        self.joins
            .iter()
            .map(|join| Ok((join.alias.clone(), Self::relation_spec(join)?.kind)))
            .collect()
    }

    fn paged_with_joins(&self) -> bool {
        !self.joins.is_empty() && (self.skip.is_some() || self.take.is_some())
    }

    /// The SQL `get_many` would run, rendered for `backend`. With joins and paging
    /// the page is resolved in a separate id query first; this shows the single-pass form.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when a join names an unknown relation.
    pub fn to_sql(&self, backend: DbBackend) -> Result<String, ApiError> {
        let select = self
            .ordered(self.project(self.base()?)?)
            .offset(self.skip)
            .limit(self.take);
        Ok(select.build(backend).to_string())
    }

    /// Root keys of the requested page, so joined child rows do not eat into it.
    async fn page_root_keys<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Vec<sea_orm::Value>, ApiError> {
        let root_key = column_ref(&self.alias, R::PRIMARY_KEY);
        let rows = self
            .ordered(self.base()?)
            .select_only()
            .column_as(root_key.clone(), ROOT_KEY)
            .group_by(root_key)
            .offset(self.skip)
            .limit(self.take)
            .into_json()
            .all(db)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(ROOT_KEY))
            .map(bind_value)
            .collect())
    }

    /// Run the query and return every row as JSON, with joined relations folded into
    /// nested objects (one-to-one) or arrays (one-to-many).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for an unknown relation, or `ApiError::Database`.
    pub async fn get_many<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Value>, ApiError> {
        let select = if self.paged_with_joins() {
            let keys = self.page_root_keys(db).await?;
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            self.ordered(self.project(self.base()?)?)
                .filter(Expr::col((Alias::new(self.alias.as_str()), Alias::new(R::PRIMARY_KEY))).is_in(keys))
        } else {
            self.ordered(self.project(self.base()?)?)
                .offset(self.skip)
                .limit(self.take)
        };

        let rows = select.into_json().all(db).await?;
        tracing::debug!(
            resource = R::RESOURCE_NAME,
            rows = rows.len(),
            joins = self.joins.len(),
            "Fetched rows"
        );
        Ok(hydrate(rows, &self.hydration_plan()?, R::PRIMARY_KEY))
    }

    /// First row of [`get_many`](Self::get_many), limited to one row when no joins
    /// are involved.
    ///
    /// # Errors
    ///
    /// Same as [`get_many`](Self::get_many).
    pub async fn get_one<C: ConnectionTrait>(&self, db: &C) -> Result<Option<Value>, ApiError> {
        let mut single = self.clone();
        if single.joins.is_empty() {
            single.take(1);
        }
        Ok(single.get_many(db).await?.into_iter().next())
    }

    /// Number of distinct root rows matching the where-clause and joins. Paging,
    /// projection and ordering are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for an unknown relation, or `ApiError::Database`.
    pub async fn get_count<C: ConnectionTrait>(&self, db: &C) -> Result<u64, ApiError> {
        let select = self
            .base()?
            .select_only()
            .column_as(column_ref(&self.alias, R::PRIMARY_KEY), ROOT_KEY)
            .distinct();
        Ok(PaginatorTrait::count(select, db).await?)
    }
}
