//! Account error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during registration, verification and login.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] instashop_core::EmailError),

    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] instashop_core::UsernameError),

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Email or username already registered.
    #[error("user with given email or username already exists")]
    UserAlreadyExists,

    /// No account with this email.
    #[error("user not found")]
    UserNotFound,

    /// The email is already verified.
    #[error("email is already verified")]
    AlreadyVerified,

    /// The code does not match the outstanding one.
    #[error("invalid verification code")]
    InvalidCode,

    /// The outstanding code has expired.
    #[error("verification code has expired")]
    CodeExpired,

    /// Wrong password or unknown email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login attempted before verifying the email.
    #[error("please verify your email before logging in")]
    EmailNotVerified,

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] crate::services::identity::IdentityError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
