//! Account service.
//!
//! Registration, email verification by one-time code, and password login.
//! Token issuance for a logged-in user is left to the caller (see
//! [`TokenService`](crate::services::TokenService)).

mod error;

pub use error::AccountError;

use std::time::Duration;

use chrono::{DateTime, Utc};

use instashop_core::{Email, Role, Username};

use crate::db::{RepositoryError, Store};
use crate::models::{NewUser, User, VerificationCode};
use crate::services::notify::{Notification, NotificationDispatcher};
use crate::services::password::{hash_password, validate_password, verify_password};

/// Account service.
///
/// Borrows the gateway and dispatcher for the duration of one request.
pub struct AccountService<'a> {
    store: &'a dyn Store,
    notifications: &'a NotificationDispatcher,
    code_ttl: Duration,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        notifications: &'a NotificationDispatcher,
        code_ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifications,
            code_ttl,
        }
    }

    /// Register a shopper account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail`, `InvalidUsername` or
    /// `WeakPassword` for bad input, and `UserAlreadyExists` if the email or
    /// username is taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        self.create_account(username, email, password, Role::User)
            .await
    }

    /// Register an administrator. Only reachable from the CLI.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub async fn register_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        self.create_account(username, email, password, Role::Admin)
            .await
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AccountError> {
        let email = Email::parse(email)?;
        let username = Username::parse(username)?;
        validate_password(password).map_err(AccountError::WeakPassword)?;

        let password_hash = hash_password(password).map_err(|_| AccountError::PasswordHash)?;
        let verification = self.new_code();
        let code = verification.code.clone();

        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash,
                role,
                verification,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AccountError::UserAlreadyExists,
                other => AccountError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        self.notifications
            .dispatch(Notification::verification_code(user.email.as_str(), &code));

        Ok(user)
    }

    /// Verify an email with its outstanding code. The code is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` for an unknown email,
    /// `AlreadyVerified`, `InvalidCode` on mismatch, or `CodeExpired`.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), AccountError> {
        let email = Email::parse(email)?;
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if user.email_verified {
            return Err(AccountError::AlreadyVerified);
        }
        let outstanding = user.verification.ok_or(AccountError::InvalidCode)?;
        if outstanding.code != code {
            return Err(AccountError::InvalidCode);
        }
        if outstanding.is_expired(Utc::now()) {
            return Err(AccountError::CodeExpired);
        }

        // A concurrent verify or re-send may have replaced the code since the read.
        if !self.store.consume_verification_code(user.id, code).await? {
            return Err(AccountError::InvalidCode);
        }

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Issue a fresh code and email it.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` for an unknown email and
    /// `AlreadyVerified` if there is nothing left to verify.
    pub async fn resend_code(&self, email: &str) -> Result<(), AccountError> {
        let email = Email::parse(email)?;
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if user.email_verified {
            return Err(AccountError::AlreadyVerified);
        }

        let verification = self.new_code();
        self.store
            .set_verification_code(user.id, &verification)
            .await?;

        self.notifications.dispatch(Notification::verification_code(
            user.email.as_str(),
            &verification.code,
        ));
        Ok(())
    }

    /// Check credentials for a verified account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` for an unknown email or a
    /// wrong password, and `EmailNotVerified` before verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = Email::parse(email).map_err(|_| AccountError::InvalidCredentials)?;
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }
        if !user.email_verified {
            return Err(AccountError::EmailNotVerified);
        }

        Ok(user)
    }

    fn new_code(&self) -> VerificationCode {
        let expires_at = chrono::Duration::from_std(self.code_ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        VerificationCode {
            code: generate_verification_code(),
            expires_at,
        }
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}
