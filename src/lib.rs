pub mod errors;
pub mod extract;
pub mod filtering;
pub mod models;
pub mod options;
pub mod payload;
pub mod query_builder;
mod service;
pub mod traits;

pub use errors::ApiError;
pub use extract::QueryParams;
pub use models::{FindResult, Paginated, RawQuery};
pub use options::{OperationOptions, PaginatePolicy, QueryOptions};
pub use query_builder::QueryBuilder;
pub use traits::{Queryable, RelationKind, RelationSpec, Resource};
