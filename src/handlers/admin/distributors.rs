// handlers/admin/distributors.rs - /admin/distributors handlers

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::DistributorProfile;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::query::{Conditions, Paging};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Paginated};
use crate::services::distributor_service::{DistributorUpdate, NewDistributor};
use crate::services::DistributorService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DistributorListQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub city: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
    #[serde(rename = "where")]
    pub where_json: Option<String>,
}

fn service(state: &AppState) -> DistributorService {
    DistributorService::new(state.pool.clone(), state.config.security.password_iterations)
}

/// GET /admin/distributors
pub async fn distributor_list(
    State(state): State<AppState>,
    Query(query): Query<DistributorListQuery>,
) -> ApiResult<Paginated<DistributorProfile>> {
    let paging = Paging {
        limit: query.limit,
        offset: query.offset,
        order: query.order,
        where_json: query.where_json,
    };
    let filter = Conditions::new()
        .search(&["company_name", "contact_person", "email", "phone", "gst_number"], query.search)
        .flag("is_active", query.is_active)
        .eq("city", query.city)
        .apply(paging.into_filter(&state.config.api)?);
    Ok(ApiResponse::success(
        service(&state).list(filter, state.config.api.max_page_size).await?,
    ))
}

/// POST /admin/distributors - creates the login and the profile together
pub async fn distributor_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<NewDistributor>,
) -> ApiResult<DistributorProfile> {
    Ok(ApiResponse::created(service(&state).create(user, payload).await?))
}

/// GET /admin/distributors/:id
pub async fn distributor_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<DistributorProfile> {
    Ok(ApiResponse::success(service(&state).get(id).await?))
}

/// PUT /admin/distributors/:id - profile fields, `is_active`, optional password reset
pub async fn distributor_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DistributorUpdate>,
) -> ApiResult<DistributorProfile> {
    Ok(ApiResponse::success(service(&state).update(user, id, payload).await?))
}

/// DELETE /admin/distributors/:id
pub async fn distributor_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    service(&state).delete(user, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
