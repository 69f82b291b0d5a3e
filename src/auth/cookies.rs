use axum::http::{header, HeaderMap};

use crate::config::SecurityConfig;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub const ACCESS_COOKIE_PATH: &str = "/";
/// Refresh tokens are only ever sent to the auth endpoints
pub const REFRESH_COOKIE_PATH: &str = "/auth";

/// Render a `Set-Cookie` value
pub fn build_cookie(name: &str, value: &str, path: &str, max_age_secs: i64, security: &SecurityConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax",
        name, value, path, max_age_secs
    );
    if security.cookie_secure {
        cookie.push_str("; Secure");
    }
    if let Some(domain) = &security.cookie_domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    cookie
}

/// Render a `Set-Cookie` value that deletes the cookie
pub fn clear_cookie(name: &str, path: &str, security: &SecurityConfig) -> String {
    build_cookie(name, "", path, 0, security)
}

/// Find a cookie value across all `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Token from `Authorization: Bearer <token>`
pub fn read_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; access_token=abc.def.ghi"));
        headers.append(header::COOKIE, HeaderValue::from_static("refresh_token=rrr"));
        assert_eq!(read_cookie(&headers, ACCESS_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("rrr"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));
        assert_eq!(read_cookie(&headers, ACCESS_COOKIE), None);
    }

    #[test]
    fn bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(read_bearer(&headers).as_deref(), Some("tok"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(read_bearer(&headers), None);
    }

    #[test]
    fn cookie_attributes_follow_config() {
        let mut security = AppConfig::preset(Environment::Production).security;
        security.cookie_domain = Some("medcrm.example.com".to_string());
        let cookie = build_cookie(REFRESH_COOKIE, "v", REFRESH_COOKIE_PATH, 60, &security);
        assert_eq!(
            cookie,
            "refresh_token=v; Path=/auth; Max-Age=60; HttpOnly; SameSite=Lax; Secure; Domain=medcrm.example.com"
        );

        let dev = AppConfig::preset(Environment::Development).security;
        assert!(!clear_cookie(ACCESS_COOKIE, "/", &dev).contains("Secure"));
        assert!(clear_cookie(ACCESS_COOKIE, "/", &dev).contains("Max-Age=0"));
    }
}
