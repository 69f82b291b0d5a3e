// handlers/protected/me.rs - GET /auth/me handler

use axum::{extract::State, Extension};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::auth_service::SessionUser;
use crate::services::AuthService;
use crate::state::AppState;

/// GET /auth/me - the signed-in user, with the distributor profile for distributors
pub async fn me_get(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<SessionUser> {
    let service = AuthService::new(
        state.pool.clone(),
        state.tokens.clone(),
        state.config.security.password_iterations,
    );
    Ok(ApiResponse::success(service.current_user(user.id).await?))
}
