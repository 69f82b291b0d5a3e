use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{text_enum, Role};

text_enum! {
    /// Kinds of entries in the admin activity feed
    pub enum ActivityAction ("activity action") {
        UserLogin => "user_login",
        ProductCreated => "product_created",
        ProductUpdated => "product_updated",
        ProductDeleted => "product_deleted",
        DistributorCreated => "distributor_created",
        DistributorUpdated => "distributor_updated",
        DistributorDeleted => "distributor_deleted",
        OrderPlaced => "order_placed",
        OrderStatusChanged => "order_status_changed",
        OrderCancelled => "order_cancelled",
        PaymentSubmitted => "payment_submitted",
        PaymentApproved => "payment_approved",
        PaymentRejected => "payment_rejected",
    }
}

impl ActivityAction {
    pub fn entity_type(&self) -> &'static str {
        match self {
            ActivityAction::UserLogin => "user",
            ActivityAction::ProductCreated | ActivityAction::ProductUpdated | ActivityAction::ProductDeleted => {
                "product"
            }
            ActivityAction::DistributorCreated
            | ActivityAction::DistributorUpdated
            | ActivityAction::DistributorDeleted => "distributor",
            ActivityAction::OrderPlaced | ActivityAction::OrderStatusChanged | ActivityAction::OrderCancelled => {
                "order"
            }
            ActivityAction::PaymentSubmitted | ActivityAction::PaymentApproved | ActivityAction::PaymentRejected => {
                "payment"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<Role>,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
