use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::models::{ActivityAction, ActivityLog, OrderStatus};
use crate::database::{DatabaseError, Repository};
use crate::filter::{ColumnDef, ColumnKind, FilterData};
use crate::middleware::response::Paginated;
use crate::middleware::AuthUser;

use super::ServiceResult;

pub const ACTIVITY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("action", ColumnKind::Text),
    ColumnDef::new("entity_type", ColumnKind::Text),
    ColumnDef::new("entity_id", ColumnKind::Uuid),
    ColumnDef::new("actor_id", ColumnKind::Uuid),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
];

/// Products at or below this many units count as low stock on the dashboard
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// One entry for the activity feed
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor: Option<AuthUser>,
    pub action: ActivityAction,
    pub entity_id: Option<Uuid>,
    pub message: String,
    pub metadata: Value,
}

impl NewActivity {
    pub fn new(actor: AuthUser, action: ActivityAction, entity_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            actor: Some(actor),
            action,
            entity_id: Some(entity_id),
            message: message.into(),
            metadata: json!({}),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub products: ProductCounts,
    pub distributors: DistributorCounts,
    pub orders_by_status: BTreeMap<String, i64>,
    pub pending_payments: PendingPayments,
    pub approved_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductCounts {
    pub total: i64,
    pub active: i64,
    pub low_stock: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DistributorCounts {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingPayments {
    pub count: i64,
    pub amount: Decimal,
}

pub struct ActivityService {
    pool: PgPool,
}

impl ActivityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write an activity row on the caller's connection, normally inside the
    /// transaction that made the change.
    pub async fn record(conn: &mut PgConnection, entry: NewActivity) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, actor_id, actor_role, action, entity_type, entity_id, message, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor.map(|a| a.id))
        .bind(entry.actor.map(|a| a.role))
        .bind(entry.action)
        .bind(entry.action.entity_type())
        .bind(entry.entity_id)
        .bind(&entry.message)
        .bind(&entry.metadata)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        tracing::debug!("Recorded activity {}: {}", entry.action, entry.message);
        Ok(())
    }

    /// Newest entries first
    pub async fn recent(&self, mut filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<ActivityLog>> {
        filter.order = Some(json!("created_at desc"));
        let repo = Repository::<ActivityLog>::new("activity_logs", ACTIVITY_COLUMNS, self.pool.clone());
        Ok(repo.select_page(filter, max_limit).await?)
    }

    pub async fn dashboard(&self) -> ServiceResult<DashboardSummary> {
        let products = sqlx::query_as::<_, ProductCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_active) AS active,
                   COUNT(*) FILTER (WHERE is_active AND stock_quantity <= $1) AS low_stock
            FROM products
            "#,
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        let distributors = sqlx::query_as::<_, DistributorCounts>(
            r#"
            SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE u.is_active) AS active
            FROM distributors d JOIN users u ON u.id = d.user_id
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let status_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        let mut orders_by_status: BTreeMap<String, i64> = OrderStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        orders_by_status.extend(status_rows);

        let pending_payments = sqlx::query_as::<_, PendingPayments>(
            "SELECT COUNT(*) AS count, COALESCE(SUM(amount), 0) AS amount FROM payments WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;

        let approved_revenue: Decimal =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'approved'")
                .fetch_one(&self.pool)
                .await?;

        Ok(DashboardSummary {
            products,
            distributors,
            orders_by_status,
            pending_payments,
            approved_revenue,
        })
    }
}
