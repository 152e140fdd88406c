//! Error types for views.

use thiserror::Error;

/// Result type for view operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Errors that can occur while configuring a view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Page size must be positive.
    #[error("invalid page size: {0} (must be > 0)")]
    InvalidPageSize(usize),
}
