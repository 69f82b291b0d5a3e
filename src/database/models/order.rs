use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    /// Fulfilment state of an order
    pub enum OrderStatus ("order status") {
        Pending => "pending",
        Confirmed => "confirmed",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// How much of an order has been paid, from approved payments only
    pub enum PaymentStatus ("payment status") {
        Unpaid => "unpaid",
        PartiallyPaid => "partially_paid",
        Paid => "paid",
    }
}

impl OrderStatus {
    /// Allowed next states. `Delivered` and `Cancelled` are terminal.
    pub fn next_states(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

impl PaymentStatus {
    pub fn for_amounts(paid: Decimal, total: Decimal) -> Self {
        if paid > Decimal::ZERO && paid >= total {
            PaymentStatus::Paid
        } else if paid > Decimal::ZERO {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub distributor_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub sub_total: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `order_overview` view used by list screens
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderOverview {
    pub id: Uuid,
    pub order_number: String,
    pub distributor_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub sub_total: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub company_name: String,
    #[serde(skip_serializing)]
    pub distributor_user_id: Uuid,
}

/// Order line with the product fields copied at placement time
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub unit: String,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub quantity: i32,
    pub line_sub_total: Decimal,
    pub line_discount: Decimal,
    pub line_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn no_skipping_or_reopening() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn payment_status_from_amounts() {
        let total = Decimal::new(10_000, 2);
        assert_eq!(PaymentStatus::for_amounts(Decimal::ZERO, total), PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::for_amounts(Decimal::new(2_500, 2), total), PaymentStatus::PartiallyPaid);
        assert_eq!(PaymentStatus::for_amounts(total, total), PaymentStatus::Paid);
    }

    #[test]
    fn status_strings_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        assert!("archived".parse::<OrderStatus>().is_err());
    }
}
