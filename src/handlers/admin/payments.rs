// handlers/admin/payments.rs - /admin/payments handlers

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Payment, PaymentMode, PaymentOverview, PaymentReviewStatus};
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::query::{Conditions, Paging};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Paginated};
use crate::services::PaymentService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<PaymentReviewStatus>,
    pub mode: Option<PaymentMode>,
    pub distributor_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
    #[serde(rename = "where")]
    pub where_json: Option<String>,
}

impl PaymentListQuery {
    pub fn conditions(&self) -> Conditions {
        Conditions::new()
            .eq("status", self.status)
            .eq("mode", self.mode)
            .eq("distributor_id", self.distributor_id)
            .eq("order_id", self.order_id)
    }

    pub fn paging(&self) -> Paging {
        Paging {
            limit: self.limit,
            offset: self.offset,
            order: self.order.clone(),
            where_json: self.where_json.clone(),
        }
    }
}

/// Body of approve and reject; rejections must carry a note
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub note: Option<String>,
}

/// GET /admin/payments
pub async fn payment_list(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> ApiResult<Paginated<PaymentOverview>> {
    let filter = query.conditions().apply(query.paging().into_filter(&state.config.api)?);
    let page = PaymentService::new(state.pool.clone())
        .list(filter, state.config.api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}

/// POST /admin/payments/:id/approve
pub async fn payment_approve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReviewRequest>>,
) -> ApiResult<Payment> {
    let note = payload.and_then(|Json(body)| body.note);
    let payment = PaymentService::new(state.pool.clone()).approve(user, id, note).await?;
    Ok(ApiResponse::success(payment))
}

/// POST /admin/payments/:id/reject
pub async fn payment_reject(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReviewRequest>>,
) -> ApiResult<Payment> {
    let note = payload.and_then(|Json(body)| body.note);
    let payment = PaymentService::new(state.pool.clone()).reject(user, id, note).await?;
    Ok(ApiResponse::success(payment))
}
