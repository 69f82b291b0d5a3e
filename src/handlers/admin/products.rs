// handlers/admin/products.rs - /admin/products handlers

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Product;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::query::{Conditions, Paging};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Paginated};
use crate::services::product_service::{NewProduct, ProductUpdate};
use crate::services::ProductService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
    #[serde(rename = "where")]
    pub where_json: Option<String>,
}

impl ProductListQuery {
    pub fn paging(&self) -> Paging {
        Paging {
            limit: self.limit,
            offset: self.offset,
            order: self.order.clone(),
            where_json: self.where_json.clone(),
        }
    }

    pub fn conditions(&self) -> Conditions {
        Conditions::new()
            .search(&["name", "sku", "category"], self.search.clone())
            .eq("category", self.category.as_deref())
            .flag("is_active", self.is_active)
    }
}

/// GET /admin/products
pub async fn product_list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<Paginated<Product>> {
    let filter = query.conditions().apply(query.paging().into_filter(&state.config.api)?);
    let page = ProductService::new(state.pool.clone())
        .list(filter, state.config.api.max_page_size)
        .await?;
    Ok(ApiResponse::success(page))
}

/// POST /admin/products
pub async fn product_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<NewProduct>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool.clone()).create(user, payload).await?;
    Ok(ApiResponse::created(product))
}

/// GET /admin/products/:id
pub async fn product_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Product> {
    Ok(ApiResponse::success(ProductService::new(state.pool.clone()).get(id).await?))
}

/// PUT /admin/products/:id - partial update
pub async fn product_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool.clone()).update(user, id, payload).await?;
    Ok(ApiResponse::success(product))
}

/// DELETE /admin/products/:id
pub async fn product_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool.clone()).delete(user, id).await?;
    Ok(ApiResponse::success(product))
}
