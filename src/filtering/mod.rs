//! # Query Translation
//!
//! Turns the `$`-operator query dialect into builder calls:
//!
//! 1. [`filter_query`] extracts the `$sort`, `$limit`, `$skip`, `$select` and
//!    `$relations` meta-keys into [`Filters`] and rejects unknown `$` keys.
//! 2. [`apply_query`] compiles field predicates (`age[$gt]=18`, `$or`, `$regex`).
//! 3. [`nestify`] and [`apply_filters_to_query_builder`] apply projection,
//!    relations, ordering and pagination.
//!
//! ## Dialect
//!
//! | Form | Meaning |
//! |------|---------|
//! | `field=value` | equality |
//! | `field[$in][]=a&field[$in][]=b` | `IN`; `$nin` for `NOT IN` |
//! | `field[$gt]=1` | also `$gte`, `$lt`, `$lte`, `$ne` |
//! | `$or[0][name]=a&$or[1][name]=b` | OR of AND-groups |
//! | `$regex[name]=al` | `LIKE '%al%'` |
//! | `$sort[age]=-1` | descending; any other number ascending |
//! | `$select[]=name` | projection |
//! | `$relations[]=addresses` | left join + nested hydration |
//! | `$limit=10&$skip=20` | paging |

mod compose;
mod filters;
mod operators;
mod predicates;
mod querystring;
mod sanitize;

pub use compose::{apply_filters_to_query_builder, nestify};
pub use filters::{
    AdditionalFilters, Converter, FilterQuery, FilterQueryOptions, FilterTable, Filters,
    assign_filters, filter_query,
};
pub use operators::{
    FilterKey, MAX_ROWS, OPERATORS, ParsedInt, SortDirection, SortSpec, convert_sort, get_limit, parse_int,
};
pub use predicates::apply_query;
pub use querystring::parse_query_string;
pub use sanitize::clean_query;
