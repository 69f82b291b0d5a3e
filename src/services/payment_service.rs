use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    ActivityAction, Order, OrderStatus, Payment, PaymentMode, PaymentOverview, PaymentReviewStatus, PaymentStatus,
};
use crate::database::Repository;
use crate::filter::{ColumnDef, ColumnKind, FilterData};
use crate::middleware::response::Paginated;
use crate::middleware::AuthUser;
use crate::validation::{non_blank, FieldErrors};

use super::activity_service::{ActivityService, NewActivity};
use super::order_service::distributor_id_for_user;
use super::pricing::outstanding;
use super::product_service::with_default_order;
use super::{ServiceError, ServiceResult};

pub const PAYMENT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid),
    ColumnDef::new("order_id", ColumnKind::Uuid),
    ColumnDef::new("distributor_id", ColumnKind::Uuid),
    ColumnDef::new("order_number", ColumnKind::Text),
    ColumnDef::new("company_name", ColumnKind::Text),
    ColumnDef::new("amount", ColumnKind::Numeric),
    ColumnDef::new("mode", ColumnKind::Text),
    ColumnDef::new("status", ColumnKind::Text),
    ColumnDef::new("payment_date", ColumnKind::Date),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
];

const MIN_REFERENCE_LEN: usize = 4;
const MAX_REFERENCE_LEN: usize = 64;
const MAX_BANK_LEN: usize = 100;
const MAX_REMARKS_LEN: usize = 500;
const MAX_NOTE_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPayment {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    pub payment_date: NaiveDate,
    pub remarks: Option<String>,
}

/// Field rules for a payment submission, checked against `today`
pub fn validate_payment(input: &SubmitPayment, today: NaiveDate) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new("Invalid payment");
    errors.money("amount", input.amount, false);

    let reference = non_blank(input.reference_number.clone());
    match (&reference, input.mode.requires_reference()) {
        (None, true) => errors.add(
            "reference_number",
            format!("{} is required for {} payments", input.mode.reference_label(), input.mode),
        ),
        (Some(r), _) => {
            let len = r.chars().count();
            if !(MIN_REFERENCE_LEN..=MAX_REFERENCE_LEN).contains(&len) {
                errors.add(
                    "reference_number",
                    format!("must be {} to {} characters", MIN_REFERENCE_LEN, MAX_REFERENCE_LEN),
                );
            } else if !r.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/') {
                errors.add("reference_number", "may contain only letters, digits, '-' and '/'");
            }
        }
        (None, false) => {}
    }

    let bank = non_blank(input.bank_name.clone());
    if input.mode.requires_bank() && bank.is_none() {
        errors.add("bank_name", format!("is required for {} payments", input.mode));
    }
    errors.optional_text("bank_name", bank.as_deref(), MAX_BANK_LEN);

    if input.payment_date > today {
        errors.add("payment_date", "cannot be in the future");
    }
    errors.optional_text("remarks", input.remarks.as_deref(), MAX_REMARKS_LEN);
    errors.into_result()
}

pub struct PaymentService {
    pool: PgPool,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repository(&self) -> Repository<PaymentOverview> {
        Repository::new("payment_overview", PAYMENT_COLUMNS, self.pool.clone())
    }

    pub async fn list(&self, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<PaymentOverview>> {
        let filter = with_default_order(filter, "created_at desc");
        Ok(self.repository().select_page(filter, max_limit).await?)
    }

    pub async fn list_own(&self, user_id: Uuid, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<PaymentOverview>> {
        let distributor_id = distributor_id_for_user(&self.pool, user_id).await?;
        let filter = with_default_order(filter, "created_at desc")
            .and_where(json!({ "distributor_id": distributor_id.to_string() }));
        Ok(self.repository().select_page(filter, max_limit).await?)
    }

    pub async fn submit(&self, actor: AuthUser, input: SubmitPayment) -> ServiceResult<Payment> {
        validate_payment(&input, Utc::now().date_naive())?;
        let distributor_id = distributor_id_for_user(&self.pool, actor.id).await?;

        let mut tx = self.pool.begin().await?;
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(input.order_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|o| o.distributor_id == distributor_id)
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::rejected(
                "Payment cannot be recorded",
                "order_id",
                format!("order {} is cancelled", order.order_number),
            ));
        }

        let pending: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE order_id = $1 AND status = 'pending'",
        )
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;
        let remaining = outstanding(order.total_amount, order.paid_amount, pending);
        if input.amount > remaining {
            return Err(ServiceError::rejected(
                "Payment exceeds the amount outstanding",
                "amount",
                format!("must not exceed {} outstanding on order {}", remaining, order.order_number),
            ));
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, order_id, distributor_id, amount, mode, reference_number, bank_name,
                                  payment_date, status, remarks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(distributor_id)
        .bind(input.amount)
        .bind(input.mode)
        .bind(non_blank(input.reference_number))
        .bind(non_blank(input.bank_name))
        .bind(input.payment_date)
        .bind(PaymentReviewStatus::Pending)
        .bind(non_blank(input.remarks))
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::PaymentSubmitted,
                payment.id,
                format!("Payment of {} by {} submitted for {}", payment.amount, payment.mode, order.order_number),
            )
            .with_metadata(json!({ "order_id": order.id, "order_number": order.order_number })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Payment {} submitted for order {}", payment.id, order.order_number);
        Ok(payment)
    }

    pub async fn approve(&self, actor: AuthUser, id: Uuid, note: Option<String>) -> ServiceResult<Payment> {
        self.review(actor, id, PaymentReviewStatus::Approved, non_blank(note)).await
    }

    pub async fn reject(&self, actor: AuthUser, id: Uuid, note: Option<String>) -> ServiceResult<Payment> {
        let note = non_blank(note);
        if note.is_none() {
            let mut errors = FieldErrors::new("Invalid rejection");
            errors.add("note", "is required when rejecting a payment");
            return Err(errors.into());
        }
        self.review(actor, id, PaymentReviewStatus::Rejected, note).await
    }

    async fn review(
        &self,
        actor: AuthUser,
        id: Uuid,
        decision: PaymentReviewStatus,
        note: Option<String>,
    ) -> ServiceResult<Payment> {
        let mut errors = FieldErrors::new("Invalid review");
        errors.optional_text("note", note.as_deref(), MAX_NOTE_LEN);
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;
        // Lock the order before the payment; order cancellation takes the same locks in that order
        let order_id: Uuid = sqlx::query_scalar("SELECT order_id FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if payment.status != PaymentReviewStatus::Pending {
            return Err(ServiceError::Conflict(format!("Payment has already been {}", payment.status)));
        }

        if decision == PaymentReviewStatus::Approved {
            let paid_amount = order.paid_amount + payment.amount;
            let payment_status = PaymentStatus::for_amounts(paid_amount, order.total_amount);
            sqlx::query("UPDATE orders SET paid_amount = $2, payment_status = $3, updated_at = now() WHERE id = $1")
                .bind(order.id)
                .bind(paid_amount)
                .bind(payment_status)
                .execute(&mut *tx)
                .await?;
        }

        let reviewed = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET status = $2, review_note = $3, reviewed_by = $4, reviewed_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(decision)
        .bind(&note)
        .bind(actor.id)
        .fetch_one(&mut *tx)
        .await?;

        let action = match decision {
            PaymentReviewStatus::Approved => ActivityAction::PaymentApproved,
            _ => ActivityAction::PaymentRejected,
        };
        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                action,
                id,
                format!("Payment of {} for {} {}", reviewed.amount, order.order_number, decision),
            )
            .with_metadata(json!({ "order_id": order.id, "note": note })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Payment {} {} by {}", id, decision, actor.id);
        Ok(reviewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    fn payment(mode: PaymentMode) -> SubmitPayment {
        SubmitPayment {
            order_id: Uuid::new_v4(),
            amount: Decimal::from_str("1500.00").unwrap(),
            mode,
            reference_number: None,
            bank_name: None,
            payment_date: today(),
            remarks: None,
        }
    }

    #[test]
    fn cash_needs_only_an_amount() {
        assert!(validate_payment(&payment(PaymentMode::Cash), today()).is_ok());
    }

    #[test]
    fn upi_needs_a_reference() {
        let errors = validate_payment(&payment(PaymentMode::Upi), today()).unwrap_err();
        assert_eq!(
            errors.get("reference_number"),
            Some("UPI transaction id is required for upi payments")
        );
        assert!(!errors.contains("bank_name"));

        let ok = SubmitPayment {
            reference_number: Some("UPI-4471-2210".to_string()),
            ..payment(PaymentMode::Upi)
        };
        assert!(validate_payment(&ok, today()).is_ok());
    }

    #[test]
    fn bank_transfer_and_cheque_need_bank() {
        for mode in [PaymentMode::BankTransfer, PaymentMode::Cheque] {
            let errors = validate_payment(&payment(mode), today()).unwrap_err();
            assert!(errors.contains("reference_number"));
            assert!(errors.contains("bank_name"));
        }
        let ok = SubmitPayment {
            reference_number: Some("000123".to_string()),
            bank_name: Some("State Bank of India".to_string()),
            ..payment(PaymentMode::Cheque)
        };
        assert!(validate_payment(&ok, today()).is_ok());
    }

    #[test]
    fn reference_format_is_checked() {
        let short = SubmitPayment {
            reference_number: Some("12".to_string()),
            ..payment(PaymentMode::Upi)
        };
        assert!(validate_payment(&short, today()).unwrap_err().contains("reference_number"));

        let symbols = SubmitPayment {
            reference_number: Some("abc$%^".to_string()),
            ..payment(PaymentMode::Upi)
        };
        assert!(validate_payment(&symbols, today()).unwrap_err().contains("reference_number"));
    }

    #[test]
    fn amount_and_date_rules() {
        let input = SubmitPayment {
            amount: Decimal::from_str("10.001").unwrap(),
            payment_date: today().succ_opt().unwrap(),
            remarks: Some("r".repeat(501)),
            ..payment(PaymentMode::Cash)
        };
        let errors = validate_payment(&input, today()).unwrap_err();
        assert!(errors.contains("amount"));
        assert!(errors.contains("payment_date"));
        assert!(errors.contains("remarks"));

        let zero = SubmitPayment {
            amount: Decimal::ZERO,
            ..payment(PaymentMode::Cash)
        };
        assert!(validate_payment(&zero, today()).unwrap_err().contains("amount"));
    }
}
