//! Bearer token extractor.
//!
//! Resolves the caller's [`Identity`] from `Authorization: Bearer <token>`.
//! The `Bearer ` prefix is optional.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use crate::error::{AppError, set_sentry_user};
use crate::services::{Identity, IdentityError};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(identity): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, user {}!", identity.user_id)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(IdentityError::MissingToken)?;
        let identity = state.tokens().resolve(token)?;

        tracing::Span::current().record("user_id", identity.user_id.as_i32());
        set_sentry_user(&identity.user_id);

        Ok(Self(identity))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_prefix_is_optional() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
