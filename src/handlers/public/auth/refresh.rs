// handlers/public/auth/refresh.rs - POST /auth/refresh handler

use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use serde_json::json;

use crate::auth::{cookies, AuthError};
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

use super::session_cookies;

/// POST /auth/refresh - rotate the refresh cookie and issue a new access token
pub async fn refresh_post(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let token = cookies::read_cookie(&headers, cookies::REFRESH_COOKIE).ok_or(AuthError::MissingToken)?;

    let service = AuthService::new(
        state.pool.clone(),
        state.tokens.clone(),
        state.config.security.password_iterations,
    );
    let session = service.refresh(&token).await?;
    let cookies = session_cookies(&session.tokens, &state.config.security)?;

    Ok((
        cookies,
        ApiResponse::success(json!({
            "user": session.user,
            "access_token_expires_at": session.tokens.access.expires_at,
        })),
    ))
}
