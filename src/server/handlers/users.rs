//! Account creation and token endpoints. These are the only unauthenticated
//! API routes besides the health check.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::super::auth::TokenType;
use super::super::AppState;
use super::helpers::{required_text, ApiJson};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Confirmation; must equal `password`.
    pub password2: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ServiceResult<Response> {
    let username = required_text(req.username, "username")?;
    let password = required_text(req.password, "password")?;
    let password2 = required_text(req.password2, "password2")?;
    if password != password2 {
        return Err(ServiceError::validation("Password fields didn't match."));
    }

    let user = state.accounts.create(&username, &password).await?;
    Ok((StatusCode::CREATED, Json(user.summary())).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ServiceResult<Response> {
    let username = required_text(req.username, "username")?;
    let password = required_text(req.password, "password")?;

    let user = state.accounts.authenticate(&username, &password).await?;
    let tokens = state.tokens.issue(&user)?;
    tracing::info!("User {} logged in", user.username);
    Ok(Json(json!({
        "access": tokens.access,
        "refresh": tokens.refresh,
        "user_data": user.summary(),
    }))
    .into_response())
}

/// Exchange a refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ServiceResult<Response> {
    let token = required_text(req.refresh, "refresh")?;
    let claims = state.tokens.verify(&token, TokenType::Refresh)?;

    let user = state.accounts.active_user(claims.user_id()?).await?;
    let access = state.tokens.access_token(user.id, &user.username)?;
    Ok(Json(json!({ "access": access })).into_response())
}
