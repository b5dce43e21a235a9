use crate::filtering::parse_query_string;
use crate::models::RawQuery;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

/// Axum extractor decoding the request's bracket-notation query string into a
/// [`RawQuery`]. The request extensions are carried along in `RawQuery::extensions`.
///
/// ```rust,ignore
/// async fn list_users(
///     State(db): State<DatabaseConnection>,
///     QueryParams(query): QueryParams,
/// ) -> Result<Json<FindResult>, ApiError> {
///     Ok(Json(Users::find(&db, query, OperationOptions::default()).await?))
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub RawQuery);

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let params = parse_query_string(parts.uri.query().unwrap_or_default());
        Ok(Self(RawQuery {
            params,
            extensions: parts.extensions.clone(),
        }))
    }
}
