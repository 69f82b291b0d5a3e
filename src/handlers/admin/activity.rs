// handlers/admin/activity.rs - GET /admin/recent-activity and GET /admin/dashboard

use axum::extract::State;
use serde::Deserialize;

use crate::database::models::{ActivityAction, ActivityLog};
use crate::handlers::extract::Query;
use crate::handlers::query::{Conditions, Paging};
use crate::middleware::{ApiResponse, ApiResult, Paginated};
use crate::services::activity_service::DashboardSummary;
use crate::services::ActivityService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub action: Option<ActivityAction>,
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /admin/recent-activity - newest first
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Paginated<ActivityLog>> {
    let api = &state.config.api;
    let paging = Paging {
        limit: Some(query.limit.unwrap_or(api.recent_activity_limit)),
        offset: query.offset,
        ..Default::default()
    };
    let filter = Conditions::new()
        .eq("action", query.action)
        .eq("entity_type", query.entity_type)
        .apply(paging.into_filter(api)?);
    let page = ActivityService::new(state.pool.clone())
        .recent(filter, api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}

/// GET /admin/dashboard
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    Ok(ApiResponse::success(ActivityService::new(state.pool.clone()).dashboard().await?))
}
