use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{AuthError, TokenCodec};
use crate::config::AppConfig;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenCodec,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Result<Self, AuthError> {
        let tokens = TokenCodec::new(&config.security)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            tokens,
        })
    }
}
