// handlers/public/root.rs - GET / handler

use axum::response::Json;
use serde_json::{json, Value};

/// GET / - service descriptor listing the route groups
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Med CRM API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "B2B ordering between a company and its distributors",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/auth/login, /auth/refresh, /auth/logout (public), /auth/me (signed in)",
                "admin": "/admin/products, /admin/distributors, /admin/orders, /admin/payments, /admin/recent-activity, /admin/dashboard (admin)",
                "distributor": "/distributor/profile, /distributor/products, /distributor/place-order, /distributor/orders, /distributor/payments (distributor)",
            }
        }
    }))
}
