// handlers/distributor/payments.rs - payment submissions by the caller

use axum::{extract::State, Extension};

use crate::database::models::{Payment, PaymentOverview};
use crate::handlers::admin::payments::PaymentListQuery;
use crate::handlers::extract::{Json, Query};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Paginated};
use crate::services::payment_service::SubmitPayment;
use crate::services::PaymentService;
use crate::state::AppState;

/// POST /distributor/payments - stored as pending until an admin reviews it
pub async fn payment_submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmitPayment>,
) -> ApiResult<Payment> {
    let payment = PaymentService::new(state.pool.clone()).submit(user, payload).await?;
    Ok(ApiResponse::created(payment))
}

/// GET /distributor/payments
pub async fn payment_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PaymentListQuery>,
) -> ApiResult<Paginated<PaymentOverview>> {
    let query = PaymentListQuery { distributor_id: None, ..query };
    let filter = query.conditions().apply(query.paging().into_filter(&state.config.api)?);
    let page = PaymentService::new(state.pool.clone())
        .list_own(user.id, filter, state.config.api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}
