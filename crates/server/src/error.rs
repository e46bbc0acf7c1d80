//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Each error maps to a status
//! and a stable code, rendered as
//! `{"success": false, "message", "httpStatusCode", "error", "service"}`.
//! Server errors are captured to Sentry and never expose driver text.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AccountError, IdentityError, ServiceError};

/// Service name reported in every error body.
pub const SERVICE_NAME: &str = "instashop";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog or order operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Account operation failed.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Bearer token missing or invalid.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Malformed request body or path.
    #[error("{0}")]
    BadRequest(String),

    /// No route matches the request path.
    #[error("route not found")]
    RouteNotFound,

    /// The request deadline expired before the handler finished.
    #[error("request timed out")]
    Timeout,
}

/// Stable, machine-readable error codes.
pub mod codes {
    pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BUSINESS_RULE_VIOLATION: &str = "BUSINESS_RULE_VIOLATION";
    pub const NO_MATCHING_PENDING_PRODUCT: &str = "NO_MATCHING_PENDING_PRODUCT";
    pub const DUPLICATE_ENTRY: &str = "DUPLICATE_ENTRY";
    pub const FOREIGN_KEY_CONSTRAINT: &str = "FOREIGN_KEY_CONSTRAINT";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

type Classified = (StatusCode, &'static str);

const fn repository_status(err: &RepositoryError) -> Classified {
    match err {
        RepositoryError::Conflict(_) => (StatusCode::CONFLICT, codes::DUPLICATE_ENTRY),
        RepositoryError::ForeignKey(_) => (StatusCode::BAD_REQUEST, codes::FOREIGN_KEY_CONSTRAINT),
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR)
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::Conflict(_) => "duplicate entry".to_owned(),
        RepositoryError::ForeignKey(_) => "referenced record does not exist".to_owned(),
        RepositoryError::NotFound => "not found".to_owned(),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            "Internal server error".to_owned()
        }
    }
}

impl AppError {
    /// HTTP status and stable code for this error.
    #[must_use]
    pub const fn classify(&self) -> Classified {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, codes::VALIDATION_ERROR),
                ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, codes::FORBIDDEN),
                ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
                ServiceError::BusinessRule(_) => {
                    (StatusCode::CONFLICT, codes::BUSINESS_RULE_VIOLATION)
                }
                ServiceError::NoMatchingPendingProduct => {
                    (StatusCode::CONFLICT, codes::NO_MATCHING_PENDING_PRODUCT)
                }
                ServiceError::Repository(err) => repository_status(err),
            },
            Self::Account(err) => match err {
                AccountError::InvalidEmail(_)
                | AccountError::InvalidUsername(_)
                | AccountError::WeakPassword(_)
                | AccountError::InvalidCode
                | AccountError::CodeExpired => (StatusCode::BAD_REQUEST, codes::VALIDATION_ERROR),
                AccountError::UserAlreadyExists => (StatusCode::CONFLICT, codes::DUPLICATE_ENTRY),
                AccountError::UserNotFound => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
                AccountError::AlreadyVerified => {
                    (StatusCode::CONFLICT, codes::BUSINESS_RULE_VIOLATION)
                }
                AccountError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, codes::AUTHENTICATION_FAILED)
                }
                AccountError::EmailNotVerified => (StatusCode::FORBIDDEN, codes::FORBIDDEN),
                AccountError::Repository(err) => repository_status(err),
                AccountError::Token(_) | AccountError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR)
                }
            },
            Self::Identity(err) => match err {
                IdentityError::MissingToken | IdentityError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, codes::AUTHENTICATION_FAILED)
                }
                IdentityError::Signing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR)
                }
            },
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, codes::VALIDATION_ERROR),
            Self::RouteNotFound => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
            Self::Timeout => (StatusCode::REQUEST_TIMEOUT, codes::REQUEST_TIMEOUT),
        }
    }

    /// Client-facing message. Server errors are replaced with a generic one.
    fn public_message(&self) -> String {
        if self.classify().0.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Service(ServiceError::Repository(err))
            | Self::Account(AccountError::Repository(err)) => repository_message(err),
            _ => self.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    message: String,
    http_status_code: u16,
    error: &'static str,
    service: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            success: false,
            message: self.public_message(),
            http_status_code: status.as_u16(),
            error: code,
            service: SERVICE_NAME,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) =
            render(ServiceError::BusinessRule("only pending orders can be canceled").into()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": "only pending orders can be canceled",
                "httpStatusCode": 409,
                "error": "BUSINESS_RULE_VIOLATION",
                "service": "instashop",
            })
        );
    }

    #[test]
    fn test_status_codes() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                IdentityError::MissingToken.into(),
                StatusCode::UNAUTHORIZED,
                codes::AUTHENTICATION_FAILED,
            ),
            (
                ServiceError::Forbidden("no".to_owned()).into(),
                StatusCode::FORBIDDEN,
                codes::FORBIDDEN,
            ),
            (
                ServiceError::Validation("bad".to_owned()).into(),
                StatusCode::BAD_REQUEST,
                codes::VALIDATION_ERROR,
            ),
            (
                ServiceError::NotFound("order").into(),
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
            ),
            (
                ServiceError::NoMatchingPendingProduct.into(),
                StatusCode::CONFLICT,
                codes::NO_MATCHING_PENDING_PRODUCT,
            ),
            (
                AccountError::UserAlreadyExists.into(),
                StatusCode::CONFLICT,
                codes::DUPLICATE_ENTRY,
            ),
            (
                ServiceError::Repository(RepositoryError::ForeignKey("fk".to_owned())).into(),
                StatusCode::BAD_REQUEST,
                codes::FOREIGN_KEY_CONSTRAINT,
            ),
            (
                AccountError::InvalidCredentials.into(),
                StatusCode::UNAUTHORIZED,
                codes::AUTHENTICATION_FAILED,
            ),
            (
                AccountError::PasswordHash.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL_ERROR,
            ),
            (
                AppError::Timeout,
                StatusCode::REQUEST_TIMEOUT,
                codes::REQUEST_TIMEOUT,
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.classify(), (status, code), "{err}");
        }
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err: AppError =
            ServiceError::Repository(RepositoryError::Database(sqlx::Error::PoolTimedOut)).into();
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "INTERNAL_ERROR");
    }
}
