//! User domain types.

use chrono::{DateTime, Utc};

use instashop_core::{Email, Role, UserId, Username};

/// A registered account (domain type).
///
/// Never serialized: the password hash and verification code stay server-side.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique display name.
    pub username: Username,
    /// Unique login email.
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Role fixed at creation.
    pub role: Role,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// Outstanding one-time code, cleared once consumed.
    pub verification: Option<VerificationCode>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("email_verified", &self.email_verified)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// A one-time email verification code and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    /// Six decimal digits.
    pub code: String,
    /// The code is rejected at or after this instant.
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    /// Whether the code can no longer be used at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Fields required to insert a user.
#[derive(Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub verification: VerificationCode,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_verification_code_expiry_boundary() {
        let now = Utc::now();
        let code = VerificationCode {
            code: "123456".to_owned(),
            expires_at: now + Duration::minutes(15),
        };
        assert!(!code.is_expired(now));
        assert!(code.is_expired(now + Duration::minutes(15)));
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(1),
            username: Username::parse("buyer").unwrap(),
            email: Email::parse("buyer@example.com").unwrap(),
            password_hash: "$argon2id$v=19$secret-hash".to_owned(),
            role: Role::User,
            email_verified: false,
            verification: None,
            created_at: now,
            updated_at: now,
        };
        let debug = format!("{user:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret-hash"));
    }
}
