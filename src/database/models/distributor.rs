use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Distributor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub credit_limit: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `distributor_profiles` view: the distributor joined with its login
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DistributorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub credit_limit: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}
