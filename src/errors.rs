//! # Error Handling
//!
//! Every failure the query layer can produce is an [`ApiError`]. Client mistakes
//! (an unknown `$` key, a payload of the wrong shape, a missing record) map to 4xx
//! responses carrying a readable message. Database and integration failures map to
//! 500 and only a generic message is returned; the details go to `tracing`.
//!
//! ```rust,ignore
//! use filtercrate::{ApiError, Resource};
//!
//! async fn list_users(
//!     State(db): State<DatabaseConnection>,
//!     QueryParams(query): QueryParams,
//! ) -> Result<Json<FindResult>, ApiError> {
//!     Ok(Json(User::find(&db, query, OperationOptions::default()).await?))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Errors raised while translating and executing a query.
#[derive(Debug)]
pub enum ApiError {
    /// 400 - a `$`-prefixed key that is neither a recognised filter nor an allowed operator
    InvalidQueryParameter {
        /// The offending key, e.g. `$where`
        key: String,
        /// The full query the key was found in
        query: serde_json::Value,
    },

    /// 400 - single/bulk mode does not match the payload (object vs array)
    InvalidPayloadShape {
        /// User-facing error message
        message: String,
    },

    /// 404 - a record addressed by id does not exist
    NotFound {
        /// Resource type (e.g. "User")
        resource: String,
        /// Optional id that was not found
        id: Option<String>,
    },

    /// 500 - a caller did not pass the soft-delete handling flag
    MissingModeFlag {
        /// Operation that required the flag
        operation: String,
    },

    /// 400 - any other invalid input (unknown relation, payload type mismatch)
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 500 - database error (details logged, not exposed)
    Database {
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 - generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 400 error for an unrecognised `$` key
    pub fn invalid_query_parameter(key: impl Into<String>, query: serde_json::Value) -> Self {
        Self::InvalidQueryParameter {
            key: key.into(),
            query,
        }
    }

    /// Create a 400 error for a payload whose shape does not match the operation mode
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::invalid_payload_shape("Bulk creation requires an array of objects."));
    /// ```
    pub fn invalid_payload_shape(message: impl Into<String>) -> Self {
        Self::InvalidPayloadShape {
            message: message.into(),
        }
    }

    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 500 error for a missing `handle_soft_delete` flag
    pub fn missing_mode_flag(operation: impl Into<String>) -> Self {
        Self::MissingModeFlag {
            operation: operation.into(),
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 500 error from a database error. The details are logged, never returned.
    pub fn database(err: DbErr) -> Self {
        Self::Database { internal: err }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidQueryParameter { .. }
            | Self::InvalidPayloadShape { .. }
            | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MissingModeFlag { .. } | Self::Database { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidQueryParameter { key, .. } => format!("Invalid query parameter: {key}"),
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::InvalidPayloadShape { message }
            | Self::BadRequest { message }
            | Self::Internal { message, .. } => message.clone(),
            Self::MissingModeFlag { .. } | Self::Database { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::MissingModeFlag { operation } => {
                tracing::error!(
                    operation = %operation,
                    "handle_soft_delete was not provided"
                );
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::InvalidQueryParameter { key, query } => {
                tracing::debug!(key = %key, query = %query, "Rejected query parameter");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingModeFlag { operation } => {
                write!(f, "handle_soft_delete not provided in {operation}")
            }
            Self::Database { internal } => write!(f, "database error: {internal}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for ApiError {}

/// `DbErr::RecordNotFound` becomes a 404 for a generic "Resource", every other database
/// error becomes 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                tracing::debug!(message = %msg, "Record not found");
                Self::NotFound {
                    resource: "Resource".to_string(),
                    id: None,
                }
            }
            _ => Self::Database { internal: err },
        }
    }
}
