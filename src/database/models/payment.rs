use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    pub enum PaymentMode ("payment mode") {
        Cash => "cash",
        Upi => "upi",
        BankTransfer => "bank_transfer",
        Cheque => "cheque",
    }
}

text_enum! {
    /// Admin review state of a submitted payment
    pub enum PaymentReviewStatus ("payment review status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl PaymentMode {
    pub fn requires_reference(&self) -> bool {
        !matches!(self, PaymentMode::Cash)
    }

    pub fn requires_bank(&self) -> bool {
        matches!(self, PaymentMode::BankTransfer | PaymentMode::Cheque)
    }

    /// What the reference number means for this mode, used in messages
    pub fn reference_label(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "receipt number",
            PaymentMode::Upi => "UPI transaction id",
            PaymentMode::BankTransfer => "UTR number",
            PaymentMode::Cheque => "cheque number",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub distributor_id: Uuid,
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    pub payment_date: NaiveDate,
    pub status: PaymentReviewStatus,
    pub remarks: Option<String>,
    pub review_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `payment_overview` view
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentOverview {
    pub id: Uuid,
    pub order_id: Uuid,
    pub distributor_id: Uuid,
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    pub payment_date: NaiveDate,
    pub status: PaymentReviewStatus,
    pub remarks: Option<String>,
    pub review_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_number: String,
    pub order_total: Decimal,
    pub company_name: String,
}
