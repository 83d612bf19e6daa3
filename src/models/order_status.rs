use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a production order, stored and transmitted as its numeric code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    #[sea_orm(num_value = 0)]
    Pending,
    #[sea_orm(num_value = 1)]
    Planned,
    #[sea_orm(num_value = 2)]
    InProduction,
    #[sea_orm(num_value = 3)]
    Suspended,
    #[sea_orm(num_value = 4)]
    Completed,
    #[sea_orm(num_value = 5)]
    Shipped,
    #[sea_orm(num_value = 6)]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Planned,
        OrderStatus::InProduction,
        OrderStatus::Suspended,
        OrderStatus::Completed,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    pub fn code(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Planned => 1,
            OrderStatus::InProduction => 2,
            OrderStatus::Suspended => 3,
            OrderStatus::Completed => 4,
            OrderStatus::Shipped => 5,
            OrderStatus::Cancelled => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Planned => "Planned",
            OrderStatus::InProduction => "In production",
            OrderStatus::Suspended => "Suspended",
            OrderStatus::Completed => "Completed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Terminal orders can no longer become overdue.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Shipped | OrderStatus::Cancelled
        )
    }

    /// Parses a status code as it appears in query strings (`"3"`).
    pub fn parse_code(raw: &str) -> Result<Self, InvalidOrderStatus> {
        raw.trim()
            .parse::<u8>()
            .map_err(|_| InvalidOrderStatus(raw.trim().to_string()))
            .and_then(|code| {
                OrderStatus::try_from(code).map_err(|_| InvalidOrderStatus(code.to_string()))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status code: {0}")]
pub struct InvalidOrderStatus(pub String);

impl TryFrom<u8> for OrderStatus {
    type Error = InvalidOrderStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or_else(|| InvalidOrderStatus(code.to_string()))
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_cover_zero_to_six() {
        let codes: Vec<u8> = OrderStatus::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(OrderStatus::try_from(7).is_err());
    }

    #[test]
    fn serializes_as_numeric_code() {
        let json = serde_json::to_string(&OrderStatus::Suspended).unwrap();
        assert_eq!(json, "3");
        let parsed: OrderStatus = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, OrderStatus::Completed);
        assert!(serde_json::from_str::<OrderStatus>("9").is_err());
    }

    #[test]
    fn parse_code_rejects_garbage() {
        assert_eq!(OrderStatus::parse_code(" 2 "), Ok(OrderStatus::InProduction));
        assert!(OrderStatus::parse_code("two").is_err());
        assert!(OrderStatus::parse_code("12").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Shipped.is_terminal());
        assert!(!OrderStatus::Suspended.is_terminal());
    }
}
