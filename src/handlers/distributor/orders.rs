// handlers/distributor/orders.rs - the caller's own orders

use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::database::models::{Order, OrderOverview};
use crate::handlers::admin::orders::OrderListQuery;
use crate::handlers::extract::{Json, Path, Query};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Paginated};
use crate::services::order_service::{OrderDetail, OrderLimits, PlaceOrder, PlacedOrder};
use crate::services::OrderService;
use crate::state::AppState;

/// POST /distributor/place-order
pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<PlaceOrder>,
) -> ApiResult<PlacedOrder> {
    let limits = OrderLimits::from(&state.config.api);
    let placed = OrderService::new(state.pool.clone())
        .place_order(user, payload, limits)
        .await?;
    Ok(ApiResponse::created(placed))
}

/// GET /distributor/orders
pub async fn order_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Paginated<OrderOverview>> {
    // The distributor filter is applied by the service
    let query = OrderListQuery { distributor_id: None, ..query };
    let filter = query.conditions().apply(query.paging().into_filter(&state.config.api)?);
    let page = OrderService::new(state.pool.clone())
        .list_own(user.id, filter, state.config.api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}

/// GET /distributor/orders/:id - 404 for orders of other distributors
pub async fn order_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    Ok(ApiResponse::success(
        OrderService::new(state.pool.clone()).get_own(user.id, id).await?,
    ))
}

/// POST /distributor/orders/:id/cancel - only while pending
pub async fn order_cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    Ok(ApiResponse::success(OrderService::new(state.pool.clone()).cancel(user, id).await?))
}
