use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::database::models::{
    ActivityAction, DistributorProfile, Order, OrderItem, OrderOverview, OrderStatus, Payment, Product,
};
use crate::database::Repository;
use crate::filter::{ColumnDef, ColumnKind, FilterData};
use crate::middleware::response::Paginated;
use crate::middleware::AuthUser;
use crate::validation::{money_fits, non_blank, FieldErrors};

use super::activity_service::{ActivityService, NewActivity};
use super::pricing::{compute_order_totals, LineInput, OrderTotals};
use super::product_service::with_default_order;
use super::{ServiceError, ServiceResult};

pub const ORDER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid),
    ColumnDef::new("order_number", ColumnKind::Text),
    ColumnDef::new("distributor_id", ColumnKind::Uuid),
    ColumnDef::new("company_name", ColumnKind::Text),
    ColumnDef::new("status", ColumnKind::Text),
    ColumnDef::new("payment_status", ColumnKind::Text),
    ColumnDef::new("total_amount", ColumnKind::Numeric),
    ColumnDef::new("paid_amount", ColumnKind::Numeric),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
    ColumnDef::new("updated_at", ColumnKind::Timestamp),
];

const MAX_NOTES_LEN: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    pub notes: Option<String>,
}

/// Bounds on a single order, taken from `api` config
#[derive(Debug, Clone, Copy)]
pub struct OrderLimits {
    pub max_items: usize,
    pub max_line_quantity: i32,
}

impl From<&ApiConfig> for OrderLimits {
    fn from(api: &ApiConfig) -> Self {
        Self {
            max_items: api.max_order_items,
            max_line_quantity: api.max_line_quantity,
        }
    }
}

/// An order with its lines and payments
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderOverview,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributor: Option<DistributorProfile>,
}

/// Order as returned right after placement
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub fn format_order_number(date: NaiveDate, sequence: i64) -> String {
    format!("ORD-{}-{:06}", date.format("%Y%m%d"), sequence)
}

impl PlaceOrder {
    pub fn validate(&self, limits: OrderLimits) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new("Invalid order");
        if self.items.is_empty() {
            errors.add("items", "must contain at least one line");
        } else if self.items.len() > limits.max_items {
            errors.add("items", format!("must contain at most {} lines", limits.max_items));
        }

        let mut seen = BTreeSet::new();
        for (i, line) in self.items.iter().enumerate() {
            if !seen.insert(line.product_id) {
                errors.add(format!("items[{}].product_id", i), "appears more than once");
            }
            if line.quantity < 1 || line.quantity > limits.max_line_quantity {
                errors.add(
                    format!("items[{}].quantity", i),
                    format!("must be between 1 and {}", limits.max_line_quantity),
                );
            }
        }
        errors.optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN);
        errors.into_result()
    }
}

pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repository(&self) -> Repository<OrderOverview> {
        Repository::new("order_overview", ORDER_COLUMNS, self.pool.clone())
    }

    pub async fn list(&self, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<OrderOverview>> {
        let filter = with_default_order(filter, "created_at desc");
        Ok(self.repository().select_page(filter, max_limit).await?)
    }

    pub async fn list_own(&self, user_id: Uuid, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<OrderOverview>> {
        let distributor_id = distributor_id_for_user(&self.pool, user_id).await?;
        let filter = with_default_order(filter, "created_at desc")
            .and_where(json!({ "distributor_id": distributor_id.to_string() }));
        Ok(self.repository().select_page(filter, max_limit).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<OrderDetail> {
        let mut detail = self.detail(id).await?;
        detail.distributor = sqlx::query_as::<_, DistributorProfile>("SELECT * FROM distributor_profiles WHERE id = $1")
            .bind(detail.order.distributor_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(detail)
    }

    /// Another distributor's order is reported as missing
    pub async fn get_own(&self, user_id: Uuid, id: Uuid) -> ServiceResult<OrderDetail> {
        let detail = self.detail(id).await?;
        if detail.order.distributor_user_id != user_id {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }
        Ok(detail)
    }

    async fn detail(&self, id: Uuid) -> ServiceResult<OrderDetail> {
        let order = sqlx::query_as::<_, OrderOverview>("SELECT * FROM order_overview WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        let payments = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at DESC")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(OrderDetail {
            order,
            items,
            payments,
            distributor: None,
        })
    }

    pub async fn place_order(&self, actor: AuthUser, input: PlaceOrder, limits: OrderLimits) -> ServiceResult<PlacedOrder> {
        input.validate(limits)?;
        let distributor_id = distributor_id_for_user(&self.pool, actor.id).await?;
        let product_ids: Vec<Uuid> = input.items.iter().map(|l| l.product_id).collect();

        let mut tx = self.pool.begin().await?;

        // Lock in id order so concurrent orders over the same products cannot deadlock
        let products: HashMap<Uuid, Product> =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&product_ids)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

        let mut unavailable = FieldErrors::new("Some products cannot be ordered");
        for (i, line) in input.items.iter().enumerate() {
            match products.get(&line.product_id) {
                None => unavailable.add(format!("items[{}].product_id", i), "product does not exist"),
                Some(p) if !p.is_active => {
                    unavailable.add(format!("items[{}].product_id", i), format!("{} is not available", p.name))
                }
                Some(_) => {}
            }
        }
        if !unavailable.is_empty() {
            return Err(ServiceError::Rejected(unavailable));
        }

        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = &products[&line.product_id];
            if product.stock_quantity < line.quantity {
                return Err(ServiceError::Conflict(format!(
                    "Insufficient stock for {} ({}): {} requested, {} available",
                    product.name, product.sku, line.quantity, product.stock_quantity
                )));
            }
            lines.push((product, line.quantity));
        }

        let totals = compute_order_totals(
            &lines
                .iter()
                .map(|(p, quantity)| LineInput {
                    unit_price: p.price,
                    discount_percent: p.discount_percent,
                    quantity: *quantity,
                })
                .collect::<Vec<_>>(),
        );
        check_order_size(&totals)?;

        let sequence: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let now = Utc::now();
        let order_number = format_order_number(now.date_naive(), sequence);

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, order_number, distributor_id, status, payment_status, sub_total,
                                discount_amount, total_amount, paid_amount, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'unpaid', $5, $6, $7, 0, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&order_number)
        .bind(distributor_id)
        .bind(OrderStatus::Pending)
        .bind(totals.sub_total)
        .bind(totals.discount_amount)
        .bind(totals.total_amount)
        .bind(non_blank(input.notes))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for ((product, quantity), line_totals) in lines.iter().zip(&totals.lines) {
            let item = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, product_sku, unit, unit_price,
                                         discount_percent, quantity, line_sub_total, line_discount, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.sku)
            .bind(&product.unit)
            .bind(product.price)
            .bind(product.discount_percent)
            .bind(*quantity)
            .bind(line_totals.line_sub_total)
            .bind(line_totals.line_discount)
            .bind(line_totals.line_total)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() WHERE id = $1")
                .bind(product.id)
                .bind(*quantity)
                .execute(&mut *tx)
                .await?;
            items.push(item);
        }

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::OrderPlaced,
                order.id,
                format!("Order {} placed for {}", order.order_number, order.total_amount),
            )
            .with_metadata(json!({ "order_number": order.order_number, "lines": items.len() })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Order {} placed by distributor {} ({} lines, total {})",
            order.order_number,
            distributor_id,
            items.len(),
            order.total_amount
        );
        Ok(PlacedOrder { order, items })
    }

    /// Admin status change along the order state machine
    pub async fn update_status(
        &self,
        actor: AuthUser,
        id: Uuid,
        status: OrderStatus,
        note: Option<String>,
    ) -> ServiceResult<Order> {
        let mut errors = FieldErrors::new("Invalid status change");
        errors.optional_text("note", note.as_deref(), MAX_NOTES_LEN);
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut tx, id).await?;
        if !order.status.can_transition_to(status) {
            return Err(ServiceError::Conflict(format!(
                "Order {} cannot move from {} to {}",
                order.order_number, order.status, status
            )));
        }

        let updated = if status == OrderStatus::Cancelled {
            cancel_locked(&mut tx, &order).await?
        } else {
            set_status(&mut tx, id, status).await?
        };

        let action = if status == OrderStatus::Cancelled {
            ActivityAction::OrderCancelled
        } else {
            ActivityAction::OrderStatusChanged
        };
        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                action,
                id,
                format!("Order {} moved from {} to {}", order.order_number, order.status, status),
            )
            .with_metadata(json!({ "from": order.status, "to": status, "note": non_blank(note) })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Order {} status {} -> {}", order.order_number, order.status, status);
        Ok(updated)
    }

    /// Distributor cancellation, allowed only while the order is pending
    pub async fn cancel(&self, actor: AuthUser, id: Uuid) -> ServiceResult<Order> {
        let distributor_id = distributor_id_for_user(&self.pool, actor.id).await?;

        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut tx, id).await?;
        if order.distributor_id != distributor_id {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Order {} is {} and can no longer be cancelled",
                order.order_number, order.status
            )));
        }

        let updated = cancel_locked(&mut tx, &order).await?;
        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::OrderCancelled,
                id,
                format!("Order {} cancelled by distributor", order.order_number),
            ),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Order {} cancelled by distributor {}", order.order_number, distributor_id);
        Ok(updated)
    }
}

/// Resolve the distributor row behind a distributor login
pub async fn distributor_id_for_user(pool: &PgPool, user_id: Uuid) -> ServiceResult<Uuid> {
    sqlx::query_scalar("SELECT id FROM distributors WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("No distributor profile for this account".to_string()))
}

/// Refuse orders whose amounts would not fit the money columns
fn check_order_size(totals: &OrderTotals) -> ServiceResult<()> {
    if totals.lines.iter().all(|l| money_fits(l.line_sub_total)) && money_fits(totals.sub_total) {
        Ok(())
    } else {
        Err(ServiceError::rejected(
            "Order is too large",
            "items",
            format!("order value {} exceeds the maximum order value", totals.sub_total),
        ))
    }
}

async fn lock_order(conn: &mut PgConnection, id: Uuid) -> ServiceResult<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
}

async fn set_status(conn: &mut PgConnection, id: Uuid, status: OrderStatus) -> ServiceResult<Order> {
    Ok(
        sqlx::query_as::<_, Order>("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_one(conn)
            .await?,
    )
}

/// Cancel a locked order: refuse after an approved payment, put stock back,
/// and close out payments still awaiting review.
async fn cancel_locked(conn: &mut PgConnection, order: &Order) -> ServiceResult<Order> {
    let approved: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND status = 'approved')")
            .bind(order.id)
            .fetch_one(&mut *conn)
            .await?;
    if approved {
        return Err(ServiceError::Conflict(format!(
            "Order {} has approved payments and cannot be cancelled",
            order.order_number
        )));
    }

    sqlx::query(
        r#"
        UPDATE products p SET stock_quantity = p.stock_quantity + i.quantity, updated_at = now()
        FROM order_items i
        WHERE i.order_id = $1 AND p.id = i.product_id
        "#,
    )
    .bind(order.id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE payments SET status = 'rejected', review_note = 'Order cancelled', reviewed_at = now(), updated_at = now()
        WHERE order_id = $1 AND status = 'pending'
        "#,
    )
    .bind(order.id)
    .execute(&mut *conn)
    .await?;

    set_status(conn, order.id, OrderStatus::Cancelled).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: OrderLimits = OrderLimits {
        max_items: 3,
        max_line_quantity: 100,
    };

    fn line(quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id: Uuid::new_v4(),
            quantity,
        }
    }

    #[test]
    fn order_numbers_are_dated_and_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_order_number(date, 42), "ORD-20260307-000042");
        assert_eq!(format_order_number(date, 1_234_567), "ORD-20260307-1234567");
    }

    #[test]
    fn empty_order_is_rejected() {
        let input = PlaceOrder { items: vec![], notes: None };
        assert!(input.validate(LIMITS).unwrap_err().contains("items"));
    }

    #[test]
    fn too_many_lines_are_rejected() {
        let input = PlaceOrder {
            items: (0..4).map(|_| line(1)).collect(),
            notes: None,
        };
        assert_eq!(input.validate(LIMITS).unwrap_err().get("items"), Some("must contain at most 3 lines"));
    }

    #[test]
    fn quantities_and_duplicates_are_checked() {
        let repeated = line(5);
        let input = PlaceOrder {
            items: vec![repeated.clone(), line(0), repeated],
            notes: Some("x".repeat(1001)),
        };
        let errors = input.validate(LIMITS).unwrap_err();
        assert!(errors.contains("items[1].quantity"));
        assert!(errors.contains("items[2].product_id"));
        assert!(errors.contains("notes"));
        assert!(!errors.contains("items[0].product_id"));
    }

    #[test]
    fn valid_order_passes() {
        let input = PlaceOrder {
            items: vec![line(1), line(100)],
            notes: Some("Deliver before Friday".to_string()),
        };
        assert!(input.validate(LIMITS).is_ok());
    }

    #[test]
    fn oversized_orders_are_rejected() {
        use rust_decimal::Decimal;

        let price = Decimal::new(600_000_000_000_00, 2);
        let single = compute_order_totals(&[LineInput { unit_price: price, discount_percent: Decimal::ZERO, quantity: 1 }]);
        assert!(check_order_size(&single).is_ok());

        let double = compute_order_totals(&[LineInput { unit_price: price, discount_percent: Decimal::ZERO, quantity: 2 }]);
        match check_order_size(&double) {
            Err(ServiceError::Rejected(errors)) => assert!(errors.contains("items")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
