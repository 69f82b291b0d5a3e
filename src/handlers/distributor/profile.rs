// handlers/distributor/profile.rs - GET /distributor/profile

use axum::{extract::State, Extension};

use crate::database::models::DistributorProfile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::DistributorService;
use crate::state::AppState;

pub async fn profile_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<DistributorProfile> {
    let service = DistributorService::new(state.pool.clone(), state.config.security.password_iterations);
    Ok(ApiResponse::success(service.profile_for_user(user.id).await?))
}
