//! Filter extraction: pulls the recognised `$` meta-keys out of a raw query and
//! converts them into a typed [`Filters`] object.

use super::operators::{FilterKey, OPERATORS, ParsedInt, SortSpec, convert_sort, get_limit, parse_int};
use super::sanitize::clean_query;
use crate::errors::ApiError;
use crate::models::RawQuery;
use crate::options::PaginatePolicy;
use serde_json::{Map, Value};

/// Converter for a caller-defined filter key. Receives the raw value (`None` when the
/// key is absent); returning `None` leaves the key out of the filters.
pub type Converter = fn(Option<&Value>, &FilterQueryOptions) -> Option<Value>;

/// Extra filter keys on top of the built-in operator table.
#[derive(Debug, Clone, Default)]
pub enum AdditionalFilters {
    #[default]
    None,
    /// Allow-list: present keys are copied verbatim.
    Keys(Vec<String>),
    /// Named converters, applied like the built-in ones.
    Converters(Vec<(String, Converter)>),
}

/// Options for [`filter_query`].
#[derive(Debug, Clone, Default)]
pub struct FilterQueryOptions {
    pub paginate: Option<PaginatePolicy>,
    pub filters: AdditionalFilters,
    /// Extra `$` operators the sanitizer should accept.
    pub operators: Vec<String>,
}

impl FilterQueryOptions {
    /// What the service layer uses: `$paginate` and `$regex` are part of its dialect.
    #[must_use]
    pub fn service_defaults() -> Self {
        Self {
            operators: vec!["$paginate".to_string(), "$regex".to_string()],
            ..Self::default()
        }
    }
}

/// Typed filter object.
///
/// Every populated field came out of a converter; absent keys stay `None` and are
/// never defaulted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub sort: Option<SortSpec>,
    pub limit: Option<ParsedInt>,
    pub skip: Option<ParsedInt>,
    /// `$select` as supplied; normalised by the composer.
    pub select: Option<Value>,
    /// `$relations` as supplied; normalised by the composer.
    pub relations: Option<Value>,
    /// Keys contributed by [`AdditionalFilters`].
    pub extra: Map<String, Value>,
}

impl Filters {
    /// Whether `key` was produced by the extractor.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        match FilterKey::from_key(key) {
            Some(FilterKey::Sort) => self.sort.is_some(),
            Some(FilterKey::Limit) => self.limit.is_some(),
            Some(FilterKey::Skip) => self.skip.is_some(),
            Some(FilterKey::Select) => self.select.is_some(),
            Some(FilterKey::Relations) => self.relations.is_some(),
            None => self.extra.contains_key(key),
        }
    }

    /// `$limit` when it parsed to a number.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit.and_then(ParsedInt::value)
    }

    /// `$skip` when it parsed to a number.
    #[must_use]
    pub fn skip(&self) -> Option<u64> {
        self.skip.and_then(ParsedInt::value)
    }

    fn convert(&mut self, key: FilterKey, raw: Option<&Value>, options: &FilterQueryOptions) {
        match key {
            FilterKey::Sort => {
                if let Some(raw) = raw {
                    self.sort = Some(convert_sort(raw));
                }
            }
            FilterKey::Limit => {
                if let Some(limit) = get_limit(parse_int(raw), options.paginate.as_ref()) {
                    self.limit = Some(limit);
                }
            }
            FilterKey::Skip => {
                if let Some(skip) = parse_int(raw) {
                    self.skip = Some(skip);
                }
            }
            FilterKey::Select => {
                if let Some(raw) = raw {
                    self.select = Some(raw.clone());
                }
            }
            FilterKey::Relations => {
                if let Some(raw) = raw {
                    self.relations = Some(raw.clone());
                }
            }
        }
    }
}

/// Which table [`assign_filters`] walks.
#[derive(Debug, Clone, Copy)]
pub enum FilterTable<'a> {
    /// The built-in `$sort`, `$limit`, `$skip`, `$select`, `$relations` converters.
    Operators,
    Additional(&'a AdditionalFilters),
}

/// Walk `table` against `query`, converting every recognised key into `filters`.
pub fn assign_filters<'f>(
    filters: &'f mut Filters,
    query: &Map<String, Value>,
    table: FilterTable<'_>,
    options: &FilterQueryOptions,
) -> &'f mut Filters {
    match table {
        FilterTable::Operators => {
            for key in FilterKey::ALL {
                filters.convert(key, query.get(key.as_str()), options);
            }
        }
        FilterTable::Additional(AdditionalFilters::None) => {}
        FilterTable::Additional(AdditionalFilters::Keys(keys)) => {
            for key in keys {
                if FilterKey::from_key(key).is_some() {
                    tracing::debug!(key = %key, "Built-in filter key in additional filters, ignoring");
                    continue;
                }
                if let Some(value) = query.get(key) {
                    filters.extra.insert(key.clone(), value.clone());
                }
            }
        }
        FilterTable::Additional(AdditionalFilters::Converters(converters)) => {
            for (key, converter) in converters {
                if FilterKey::from_key(key).is_some() {
                    tracing::debug!(key = %key, "Built-in filter key in additional filters, ignoring");
                    continue;
                }
                if let Some(converted) = converter(query.get(key), options) {
                    filters.extra.insert(key.clone(), converted);
                }
            }
        }
    }
    filters
}

/// Output of [`filter_query`]: the typed filters and the sanitized query.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    pub filters: Filters,
    pub query: RawQuery,
}

/// Extract filters (built-in, then additional) and sanitize the query against the
/// operator allow-list.
///
/// # Errors
///
/// Returns `ApiError::InvalidQueryParameter` for a `$` key that is neither a produced
/// filter nor an allowed operator.
pub fn filter_query(query: &RawQuery, options: &FilterQueryOptions) -> Result<FilterQuery, ApiError> {
    let mut filters = Filters::default();
    assign_filters(&mut filters, &query.params, FilterTable::Operators, options);
    assign_filters(
        &mut filters,
        &query.params,
        FilterTable::Additional(&options.filters),
        options,
    );

    let operators: Vec<&str> = OPERATORS
        .iter()
        .copied()
        .chain(options.operators.iter().map(String::as_str))
        .collect();
    let query = clean_query(query, &operators, &filters)?;

    tracing::trace!(filters = ?filters, "Extracted query filters");
    Ok(FilterQuery { filters, query })
}
