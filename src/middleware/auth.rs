use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{cookies, AuthError, Claims, TokenKind};
use crate::database::models::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller extracted from the access token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// Validates the access token (cookie first, then bearer header) and injects `AuthUser`
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let token = cookies::read_cookie(headers, cookies::ACCESS_COOKIE)
        .or_else(|| cookies::read_bearer(headers))
        .ok_or(AuthError::MissingToken)?;

    let claims = state.tokens.verify(&token, TokenKind::Access)?;

    let auth_user = AuthUser::from(claims);
    tracing::debug!("Authenticated {} ({})", auth_user.id, auth_user.role);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(Role::Admin, request, next).await
}

pub async fn require_distributor(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(Role::Distributor, request, next).await
}

async fn require_role(role: Role, request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if auth_user.role != role {
        tracing::warn!(
            "User {} with role {} denied access to {} route {}",
            auth_user.id,
            auth_user.role,
            role,
            request.uri().path()
        );
        return Err(ApiError::forbidden(format!("This action requires the {} role", role)));
    }

    Ok(next.run(request).await)
}
