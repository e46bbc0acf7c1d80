//! Account route handlers: registration, verification, login.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::extract::ApiJson;
use crate::error::Result;
use crate::state::AppState;

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Registration payload.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Email verification payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp_token: String,
}

/// Code re-send payload.
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub email: String,
}

/// Login payload.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response carrying the bearer token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a shopper account and email its verification code.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state
        .accounts()
        .register(&form.username, &form.email, &form.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully",
        }),
    ))
}

/// Verify an email with its one-time code.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .accounts()
        .verify_email(&form.email, &form.otp_token)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully",
    }))
}

/// Issue and email a fresh verification code.
#[instrument(skip(state))]
pub async fn send_email(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SendEmailRequest>,
) -> Result<Json<MessageResponse>> {
    state.accounts().resend_code(&form.email).await?;

    Ok(Json(MessageResponse {
        message: "Email sent successfully",
    }))
}

/// Exchange credentials for a bearer token.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = state.accounts().login(&form.email, &form.password).await?;
    let token = state.tokens().issue(user.id, user.role)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(TokenResponse { token }))
}
