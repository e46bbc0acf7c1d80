//! Bearer token issuance and resolution.
//!
//! Tokens are HS256 JWTs carrying `{user_id, role, iat, exp}`. The user id is
//! encoded as a decimal string on the wire.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use instashop_core::{Action, Role, UserId, allow};

use super::ServiceError;
use crate::config::AuthConfig;

/// Errors that can occur while issuing or resolving a token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No `Authorization` header was sent.
    #[error("missing token")]
    MissingToken,

    /// The token failed signature, expiry, or shape checks.
    #[error("invalid token")]
    InvalidToken,

    /// Signing a new token failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// The resolved caller of a request.
///
/// `role` is kept as the raw claim so that the authorization table, not the
/// token parser, decides what an unknown role may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: String,
}

impl Identity {
    /// Consult the authorization table for `action`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the role may not perform `action`.
    pub fn authorize(&self, action: Action) -> Result<(), ServiceError> {
        if allow(&self.role, action) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, role = %self.role, %action, "Denied by role");
            Err(ServiceError::Forbidden(format!(
                "you do not have permission to {}",
                action.describe()
            )))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Build keys from the configured signing secret.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: config.token_ttl,
        }
    }

    /// Issue a token for `user_id` with `role`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Signing` if encoding fails.
    pub fn issue(&self, user_id: UserId, role: Role) -> Result<String, IdentityError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            user_id: user_id.to_string(),
            role: role.as_str().to_owned(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(IdentityError::Signing)
    }

    /// Resolve a token into the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` for a bad signature, an expired
    /// token, or a non-numeric user id.
    pub fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            IdentityError::InvalidToken
        })?;

        let user_id = data
            .claims
            .user_id
            .parse::<i32>()
            .map_err(|_| IdentityError::InvalidToken)?;

        Ok(Identity {
            user_id: UserId::new(user_id),
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(ttl: Duration) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from("k9$Qm2!vR7@xL4#pZ8&wN3*tB6^yH1%c"),
            token_ttl: ttl,
        })
    }

    #[test]
    fn test_issue_then_resolve() {
        let tokens = service(Duration::from_secs(3600));
        let token = tokens.issue(UserId::new(7), Role::Editor).unwrap();

        let identity = tokens.resolve(&token).unwrap();
        assert_eq!(identity.user_id, UserId::new(7));
        assert_eq!(identity.role, "editor");
    }

    #[test]
    fn test_resolve_rejects_foreign_signature() {
        let issuer = service(Duration::from_secs(3600));
        let other = TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from("a different secret entirely 1234567"),
            token_ttl: Duration::from_secs(3600),
        });
        let token = other.issue(UserId::new(7), Role::User).unwrap();

        assert!(matches!(issuer.resolve(&token), Err(IdentityError::InvalidToken)));
        assert!(matches!(issuer.resolve("not.a.jwt"), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_resolve_rejects_expired_token() {
        let tokens = service(Duration::ZERO);
        let token = tokens.issue(UserId::new(7), Role::User).unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        assert!(matches!(tokens.resolve(&token), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_authorize_consults_table() {
        let shopper = Identity {
            user_id: UserId::new(1),
            role: "user".to_owned(),
        };
        assert!(shopper.authorize(Action::PlaceOrder).is_ok());
        let err = shopper.authorize(Action::CreateProduct).unwrap_err();
        assert_eq!(err.to_string(), "you do not have permission to create a product");
    }
}
