// handlers/distributor/catalog.rs - GET /distributor/products

use axum::extract::State;

use crate::database::models::CatalogProduct;
use crate::handlers::admin::products::ProductListQuery;
use crate::handlers::extract::Query;
use crate::middleware::{ApiResponse, ApiResult, Paginated};
use crate::services::ProductService;
use crate::state::AppState;

/// Active products only; stock is reduced to an `in_stock` flag
pub async fn catalog_list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<Paginated<CatalogProduct>> {
    let query = ProductListQuery { is_active: None, ..query };
    let filter = query.conditions().apply(query.paging().into_filter(&state.config.api)?);
    let page = ProductService::new(state.pool.clone())
        .catalog(filter, state.config.api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}
