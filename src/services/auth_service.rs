use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::password::{verify_dummy, verify_password};
use crate::auth::{token_fingerprint, AuthError, TokenCodec, TokenKind, TokenPair};
use crate::database::models::{ActivityAction, DistributorProfile, RefreshToken, Role, User};
use crate::database::DatabaseError;
use crate::middleware::AuthUser;
use crate::validation::{normalize_email, FieldErrors};

use super::activity_service::{ActivityService, NewActivity};
use super::{ServiceError, ServiceResult};

/// Who is signed in, as returned by login and `/auth/me`
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributor: Option<DistributorProfile>,
}

/// Result of a successful login or refresh
#[derive(Debug, Clone)]
pub struct Session {
    pub user: SessionUser,
    pub tokens: TokenPair,
}

pub struct AuthService {
    pool: PgPool,
    tokens: TokenCodec,
    password_iterations: u32,
}

impl AuthService {
    /// `password_iterations` sizes the decoy hashing done for unknown emails
    pub fn new(pool: PgPool, tokens: TokenCodec, password_iterations: u32) -> Self {
        Self {
            pool,
            tokens,
            password_iterations,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let mut errors = FieldErrors::new("Invalid login request");
        errors.email("email", email);
        if password.is_empty() {
            errors.add("password", "is required");
        }
        errors.into_result()?;

        let email = normalize_email(email);
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(user) = user else {
            verify_dummy(password, self.password_iterations);
            tracing::info!("Login failed for unknown email {}", email);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password, &user.password_hash) {
            tracing::info!("Login failed for user {}: wrong password", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            tracing::warn!("Login refused for disabled user {}", user.id);
            return Err(AuthError::AccountDisabled.into());
        }

        let now = Utc::now();
        let tokens = self.tokens.issue_pair(user.id, user.role, now)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(user.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        insert_refresh_token(&mut tx, user.id, &tokens).await?;
        let actor = AuthUser { id: user.id, role: user.role };
        ActivityService::record(
            &mut tx,
            NewActivity::new(actor, ActivityAction::UserLogin, user.id, format!("{} signed in", user.email)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("User {} ({}) logged in", user.id, user.role);
        let user = User { last_login_at: Some(now), ..user };
        Ok(Session {
            user: self.session_user(user).await?,
            tokens,
        })
    }

    /// Exchange a refresh token for a new pair, rotating the stored token
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<Session> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        let now = Utc::now();

        let stored = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE id = $1")
            .bind(claims.jti)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("unknown refresh token".to_string()))?;

        if stored.user_id != claims.sub || stored.token_hash != token_fingerprint(refresh_token) {
            return Err(AuthError::InvalidToken("refresh token does not match its record".to_string()).into());
        }
        if stored.is_revoked() {
            let revoked = self.revoke_all_for_user(claims.sub).await?;
            tracing::warn!(
                "Refresh token {} reused after rotation; revoked {} sessions of user {}",
                stored.id,
                revoked,
                claims.sub
            );
            return Err(AuthError::TokenReuse.into());
        }
        if stored.is_expired(now) {
            return Err(AuthError::InvalidToken("refresh token expired".to_string()).into());
        }

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled.into());
        }

        let tokens = self.tokens.issue_pair(user.id, user.role, now)?;

        let mut tx = self.pool.begin().await?;
        let rotated = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2, replaced_by = $3 WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(stored.id)
        .bind(now)
        .bind(tokens.refresh.jti)
        .execute(&mut *tx)
        .await?;
        if rotated.rows_affected() == 0 {
            // A concurrent refresh won the race with the same token
            return Err(AuthError::TokenReuse.into());
        }
        insert_refresh_token(&mut tx, user.id, &tokens).await?;
        tx.commit().await?;

        tracing::debug!("Rotated refresh token {} -> {}", stored.id, tokens.refresh.jti);
        Ok(Session {
            user: self.session_user(user).await?,
            tokens,
        })
    }

    /// Revoke the presented refresh token. Invalid tokens are ignored so logout always succeeds.
    pub async fn logout(&self, refresh_token: Option<&str>) -> ServiceResult<()> {
        let Some(token) = refresh_token else {
            return Ok(());
        };
        let Ok(claims) = self.tokens.verify(token, TokenKind::Refresh) else {
            tracing::debug!("Logout with an invalid refresh token; nothing to revoke");
            return Ok(());
        };

        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1 AND token_hash = $2 AND revoked_at IS NULL",
        )
        .bind(claims.jti)
        .bind(token_fingerprint(token))
        .execute(&self.pool)
        .await?;

        tracing::info!("User {} logged out", claims.sub);
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> ServiceResult<SessionUser> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled.into());
        }
        self.session_user(user).await
    }

    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        revoke_all_for_user(&mut conn, user_id).await
    }

    async fn session_user(&self, user: User) -> ServiceResult<SessionUser> {
        let distributor = match user.role {
            Role::Distributor => {
                sqlx::query_as::<_, DistributorProfile>("SELECT * FROM distributor_profiles WHERE user_id = $1")
                    .bind(user.id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            Role::Admin => None,
        };
        Ok(SessionUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            last_login_at: user.last_login_at,
            distributor,
        })
    }
}

async fn insert_refresh_token(conn: &mut PgConnection, user_id: Uuid, tokens: &TokenPair) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)")
        .bind(tokens.refresh.jti)
        .bind(user_id)
        .bind(token_fingerprint(&tokens.refresh.token))
        .bind(tokens.refresh.expires_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Revoke every live refresh token of a user on the given connection
pub async fn revoke_all_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE user_id = $1 AND revoked_at IS NULL")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
