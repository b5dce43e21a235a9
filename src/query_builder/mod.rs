//! A mutable, chainable description of one SELECT over a [`Queryable`] resource.
//!
//! The filtering layer only ever calls the configuration methods here; nothing is
//! sent to the database until [`QueryBuilder::get_many`], [`QueryBuilder::get_one`]
//! or [`QueryBuilder::get_count`] compiles the description into a sea-orm `Select`.

mod clause;
mod execute;
mod hydrate;

pub use clause::{
    Clause, ClauseKind, Comparison, Predicate, Value, bind_list, bind_value, value_label,
};

use crate::filtering::MAX_ROWS;
use crate::traits::Queryable;
use sea_orm::sea_query::{Alias, Condition, Expr, Order, SimpleExpr};
use sea_orm::{ColumnTrait, EntityName, EntityTrait};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

type ColumnOf<R> = <<R as Queryable>::Entity as EntityTrait>::Column;

/// A left join onto a named relation, projected under `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub relation: String,
    pub alias: String,
}

pub struct QueryBuilder<R> {
    alias: String,
    selection: Option<Vec<String>>,
    predicates: Vec<Predicate>,
    order_by: Vec<(String, Order)>,
    joins: Vec<Join>,
    skip: Option<u64>,
    take: Option<u64>,
    resource: PhantomData<fn() -> R>,
}

impl<R> Clone for QueryBuilder<R> {
    fn clone(&self) -> Self {
        Self {
            alias: self.alias.clone(),
            selection: self.selection.clone(),
            predicates: self.predicates.clone(),
            order_by: self.order_by.clone(),
            joins: self.joins.clone(),
            skip: self.skip,
            take: self.take,
            resource: PhantomData,
        }
    }
}

impl<R> fmt::Debug for QueryBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("alias", &self.alias)
            .field("selection", &self.selection)
            .field("predicates", &self.predicates)
            .field("order_by", &self.order_by)
            .field("joins", &self.joins)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .finish()
    }
}

impl<R: Queryable> Default for QueryBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Queryable> QueryBuilder<R> {
    /// An unfiltered builder aliased by the entity's table name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_alias(R::Entity::default().table_name())
    }

    /// The where-clause: every AND predicate, plus one OR group over the branches.
    #[must_use]
    pub fn condition(&self) -> Condition {
        let mut all = Condition::all();
        let mut any = Condition::any();
        let mut has_branches = false;

        for predicate in &self.predicates {
            match predicate {
                Predicate::And(clause) => all = all.add(self.clause_expr(clause)),
                Predicate::Or(branch) => {
                    let group = branch
                        .iter()
                        .fold(Condition::all(), |group, clause| group.add(self.clause_expr(clause)));
                    any = any.add(group);
                    has_branches = true;
                }
            }
        }

        if has_branches {
            all = all.add(any);
        }
        all
    }

    fn clause_expr(&self, clause: &Clause) -> SimpleExpr {
        let (table, column) = self.resolve(&clause.field);
        let column_type = (table == self.alias)
            .then(|| ColumnOf::<R>::from_str(column).ok())
            .flatten()
            .map(|col| col.def().get_column_type().clone());
        clause.to_expr(table, column, column_type.as_ref())
    }
}

impl<R> QueryBuilder<R> {
    /// An unfiltered builder with an explicit root alias.
    #[must_use]
    pub fn with_alias(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            selection: None,
            predicates: Vec::new(),
            order_by: Vec::new(),
            joins: Vec::new(),
            skip: None,
            take: None,
            resource: PhantomData,
        }
    }

    /// Root alias; prefixes qualified field paths such as `users.name`.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Replace the projection. An empty list leaves the current projection alone.
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if !fields.is_empty() {
            self.selection = Some(fields);
        }
        self
    }

    pub fn and_where(&mut self, clause: Clause) -> &mut Self {
        self.predicates.push(Predicate::And(clause));
        self
    }

    /// Add one OR branch. All branches together form a single group AND-ed with the
    /// plain predicates.
    pub fn or_where(&mut self, branch: Vec<Clause>) -> &mut Self {
        if !branch.is_empty() {
            self.predicates.push(Predicate::Or(branch));
        }
        self
    }

    /// Append a sort term. A field that is already sorted on keeps its first position
    /// and direction.
    pub fn add_order_by(&mut self, field: impl Into<String>, order: Order) -> &mut Self {
        let field = field.into();
        let target = self.resolve(&field);
        if self
            .order_by
            .iter()
            .any(|(existing, _)| self.resolve(existing) == target)
        {
            return self;
        }
        self.order_by.push((field, order));
        self
    }

    /// Zero clears the offset. Capped at [`MAX_ROWS`].
    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.skip = (skip > 0).then_some(skip.min(MAX_ROWS));
        self
    }

    /// Zero clears the limit. Capped at [`MAX_ROWS`].
    pub fn take(&mut self, take: u64) -> &mut Self {
        self.take = (take > 0).then_some(take.min(MAX_ROWS));
        self
    }

    /// Left-join the relation named by the last segment of `property` (`users.addresses`)
    /// and project its columns under `alias`. Joining the same alias twice is a no-op.
    pub fn left_join_and_select(
        &mut self,
        property: impl AsRef<str>,
        alias: impl Into<String>,
    ) -> &mut Self {
        let alias = alias.into();
        if self.joins.iter().any(|join| join.alias == alias) {
            return self;
        }
        let property = property.as_ref();
        let relation = property.rsplit('.').next().unwrap_or(property).to_string();
        self.joins.push(Join { relation, alias });
        self
    }

    #[must_use]
    pub fn selection(&self) -> Option<&[String]> {
        self.selection.as_deref()
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn order_terms(&self) -> &[(String, Order)] {
        &self.order_by
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    #[must_use]
    pub fn skip_count(&self) -> Option<u64> {
        self.skip
    }

    #[must_use]
    pub fn take_count(&self) -> Option<u64> {
        self.take
    }

    /// Split a field path into `(table, column)`. Unqualified fields belong to the root.
    fn resolve<'a>(&'a self, field: &'a str) -> (&'a str, &'a str) {
        field
            .split_once('.')
            .unwrap_or((self.alias.as_str(), field))
    }

    fn column_expr(&self, field: &str) -> SimpleExpr {
        let (table, column) = self.resolve(field);
        column_ref(table, column)
    }
}

pub(crate) fn column_ref(table: &str, column: &str) -> SimpleExpr {
    Expr::col((Alias::new(table), Alias::new(column))).into()
}
