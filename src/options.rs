use serde::Deserialize;

/// Defaults applied when a query does not say otherwise.
///
/// Deserializable so it can be loaded from whatever configuration source the
/// application uses; missing fields fall back to [`QueryOptions::default`].
///
/// ```rust,ignore
/// let options: QueryOptions = serde_json::from_str(r#"{"default_limit": 25, "delete_key": "deleted"}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Page size used when `$limit` is missing, zero or not a number.
    pub default_limit: u64,
    /// Offset used when `$skip` is missing, zero or not a number.
    pub default_skip: u64,
    /// Gates relation loading in [`nestify`](crate::filtering::nestify).
    pub default_pagination: bool,
    /// Boolean column marking soft-deleted rows. `None` disables soft delete handling.
    pub delete_key: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_skip: 0,
            default_pagination: true,
            delete_key: None,
        }
    }
}

/// Bounds for `$limit`.
///
/// Only takes effect when `default` is set and non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PaginatePolicy {
    pub default: Option<u64>,
    pub max: Option<u64>,
}

/// Per-call flags for the service operations of [`Resource`](crate::Resource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationOptions {
    /// Must be `Some(true)`; anything else fails with `MissingModeFlag`.
    pub handle_soft_delete: Option<bool>,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            handle_soft_delete: Some(true),
        }
    }
}

impl OperationOptions {
    /// # Errors
    ///
    /// Returns `ApiError::MissingModeFlag` unless `handle_soft_delete` is `Some(true)`.
    pub fn require_soft_delete_mode(&self, operation: &str) -> Result<(), crate::ApiError> {
        if self.handle_soft_delete == Some(true) {
            Ok(())
        } else {
            Err(crate::ApiError::missing_mode_flag(operation))
        }
    }
}
