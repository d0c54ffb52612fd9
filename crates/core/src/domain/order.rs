use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::item::ItemId;
use crate::domain::requester::{HouseholdId, RequesterId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const SETTLED: [OrderStatus; 3] = [Self::Paid, Self::Shipped, Self::Completed];

    /// Payment or fulfilment has happened, so the goods are in the household.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Shipped | Self::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidParameter {
                name: "order_status",
                reason: format!("unknown order status `{other}`"),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: u32,
    pub acquired_at: DateTime<Utc>,
}

/// A household order. Only settled orders count as acquisitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: OrderId,
    pub household_id: HouseholdId,
    pub placed_by: Option<RequesterId>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl PurchaseOrder {
    pub fn acquisitions(&self) -> Vec<AcquisitionRecord> {
        if !self.status.is_settled() {
            return Vec::new();
        }
        self.lines
            .iter()
            .map(|line| AcquisitionRecord {
                household_id: self.household_id,
                item_id: line.item_id,
                acquired_at: line.acquired_at,
            })
            .collect()
    }
}

/// One settled purchase of an item by a household.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionRecord {
    pub household_id: HouseholdId,
    pub item_id: ItemId,
    pub acquired_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{OrderId, OrderLine, OrderStatus, PurchaseOrder};
    use crate::domain::item::ItemId;
    use crate::domain::requester::HouseholdId;

    #[test]
    fn only_paid_shipped_and_completed_are_settled() {
        assert!(OrderStatus::Paid.is_settled());
        assert!(OrderStatus::Shipped.is_settled());
        assert!(OrderStatus::Completed.is_settled());
        assert!(!OrderStatus::Pending.is_settled());
        assert!(!OrderStatus::Cancelled.is_settled());
    }

    #[test]
    fn accepts_both_spellings_of_cancelled() {
        assert_eq!("canceled".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
        assert_eq!("CANCELLED".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
    }

    #[test]
    fn unsettled_orders_yield_no_acquisitions() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single().expect("valid timestamp");
        let mut order = PurchaseOrder {
            id: OrderId(1),
            household_id: HouseholdId(3),
            placed_by: None,
            status: OrderStatus::Pending,
            created_at: at,
            lines: vec![OrderLine { item_id: ItemId(9), quantity: 2, acquired_at: at }],
        };
        assert!(order.acquisitions().is_empty());

        order.status = OrderStatus::Shipped;
        let acquisitions = order.acquisitions();
        assert_eq!(acquisitions.len(), 1);
        assert_eq!(acquisitions[0].household_id, HouseholdId(3));
        assert_eq!(acquisitions[0].item_id, ItemId(9));
    }
}
