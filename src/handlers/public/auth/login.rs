// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::handlers::extract::Json;
use crate::middleware::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

use super::session_cookies;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /auth/login - verify credentials and set the session cookies
///
/// Unknown emails and wrong passwords get the same 401; disabled accounts get 403.
/// The body carries the signed-in user and the access token expiry.
pub async fn login_post(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(
        state.pool.clone(),
        state.tokens.clone(),
        state.config.security.password_iterations,
    );
    let session = service.login(&payload.email, &payload.password).await?;
    let headers = session_cookies(&session.tokens, &state.config.security)?;

    Ok((
        headers,
        ApiResponse::success(json!({
            "user": session.user,
            "access_token_expires_at": session.tokens.access.expires_at,
        })),
    ))
}
