// handlers/admin/orders.rs - /admin/orders handlers

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Order, OrderOverview, OrderStatus, PaymentStatus};
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::query::{Conditions, Paging};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Paginated};
use crate::services::order_service::OrderDetail;
use crate::services::OrderService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub distributor_id: Option<Uuid>,
    /// Inclusive lower bound on `created_at` (date or RFC 3339)
    pub from: Option<String>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<String>,
    /// Order number fragment
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
    #[serde(rename = "where")]
    pub where_json: Option<String>,
}

impl OrderListQuery {
    pub fn conditions(&self) -> Conditions {
        Conditions::new()
            .eq("status", self.status)
            .eq("payment_status", self.payment_status)
            .eq("distributor_id", self.distributor_id)
            .op("created_at", "$gte", self.from.clone())
            .op("created_at", "$lt", self.to.clone())
            .search(&["order_number", "company_name"], self.search.clone())
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

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// GET /admin/orders
pub async fn order_list(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Paginated<OrderOverview>> {
    let filter = query.conditions().apply(query.paging().into_filter(&state.config.api)?);
    let page = OrderService::new(state.pool.clone())
        .list(filter, state.config.api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}

/// GET /admin/orders/:id - order, lines, payments and distributor
pub async fn order_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<OrderDetail> {
    Ok(ApiResponse::success(OrderService::new(state.pool.clone()).get(id).await?))
}

/// PATCH /admin/orders/:id/status
pub async fn order_status_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> ApiResult<Order> {
    let order = OrderService::new(state.pool.clone())
        .update_status(user, id, payload.status, payload.note)
        .await?;
    Ok(ApiResponse::success(order))
}
