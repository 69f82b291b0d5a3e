// handlers/public/auth/mod.rs - Session endpoints
//
// Login issues an access/refresh cookie pair, refresh rotates it, logout clears it.
pub mod login;
pub mod logout;
pub mod refresh;

pub use login::login_post;
pub use logout::logout_post;
pub use refresh::refresh_post;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Utc;

use crate::auth::cookies::{self, ACCESS_COOKIE, ACCESS_COOKIE_PATH, REFRESH_COOKIE, REFRESH_COOKIE_PATH};
use crate::auth::TokenPair;
use crate::config::SecurityConfig;
use crate::error::ApiError;

/// `Set-Cookie` headers carrying a fresh token pair
pub(crate) fn session_cookies(tokens: &TokenPair, security: &SecurityConfig) -> Result<HeaderMap, ApiError> {
    let now = Utc::now();
    let access = cookies::build_cookie(
        ACCESS_COOKIE,
        &tokens.access.token,
        ACCESS_COOKIE_PATH,
        tokens.access.max_age_secs(now),
        security,
    );
    let refresh = cookies::build_cookie(
        REFRESH_COOKIE,
        &tokens.refresh.token,
        REFRESH_COOKIE_PATH,
        tokens.refresh.max_age_secs(now),
        security,
    );
    cookie_headers([access, refresh])
}

/// `Set-Cookie` headers that drop both session cookies
pub(crate) fn cleared_cookies(security: &SecurityConfig) -> Result<HeaderMap, ApiError> {
    cookie_headers([
        cookies::clear_cookie(ACCESS_COOKIE, ACCESS_COOKIE_PATH, security),
        cookies::clear_cookie(REFRESH_COOKIE, REFRESH_COOKIE_PATH, security),
    ])
}

fn cookie_headers(values: [String; 2]) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    for value in values {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| ApiError::internal_server_error(format!("Invalid cookie header: {}", e)))?;
        headers.append(header::SET_COOKIE, value);
    }
    Ok(headers)
}
