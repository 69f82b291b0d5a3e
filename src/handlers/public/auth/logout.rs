// handlers/public/auth/logout.rs - POST /auth/logout handler

use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use serde_json::json;

use crate::auth::cookies;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

use super::cleared_cookies;

/// POST /auth/logout - revoke the refresh token if one is presented; always clears cookies
pub async fn logout_post(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let token = cookies::read_cookie(&headers, cookies::REFRESH_COOKIE);

    let service = AuthService::new(
        state.pool.clone(),
        state.tokens.clone(),
        state.config.security.password_iterations,
    );
    if let Err(e) = service.logout(token.as_deref()).await {
        // Cookies are cleared regardless; a failed revoke only leaves a token that expires on its own
        tracing::warn!("Logout could not revoke refresh token: {}", e);
    }

    Ok((cleared_cookies(&state.config.security)?, ApiResponse::success(json!({ "logged_out": true }))))
}
