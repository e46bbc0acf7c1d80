//! Errors shared by the catalog and order services.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during catalog and order operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed a precondition; nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The caller's role or ownership does not permit the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The named entity does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The entity exists but its state forbids the operation.
    #[error("{0}")]
    BusinessRule(&'static str),

    /// A conditional delete matched no pending product owned by the caller.
    #[error("no matching pending product found")]
    NoMatchingPendingProduct,

    /// Repository/database error, returned unmodified.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
