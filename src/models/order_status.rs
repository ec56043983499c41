use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    /// Any label outside the known lifecycle, stored verbatim.
    Custom(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Custom(label) => label,
        }
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "confirmed" => OrderStatus::Confirmed,
            "shipped" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Custom(raw.to_string()),
        }
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Shipped, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(OrderStatus::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Disallowed transitions are rejected with a conflict.
    Strict,
    /// Disallowed transitions are appended and logged.
    Permissive,
}

impl FromStr for TransitionPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "permissive" => Ok(TransitionPolicy::Permissive),
            other => Err(AppError::ConfigError(format!(
                "Unknown order status policy: {}",
                other
            ))),
        }
    }
}

impl TransitionPolicy {
    /// Decides whether `next` may be appended after `current`.
    /// The first status of an order is always accepted.
    pub fn check(self, order_id: i32, current: Option<&OrderStatus>, next: &OrderStatus) -> Result<()> {
        let Some(current) = current else {
            return Ok(());
        };

        if current.can_transition_to(next) {
            return Ok(());
        }

        match self {
            TransitionPolicy::Strict => Err(AppError::Conflict(format!(
                "Order status cannot change from {} to {}",
                current, next
            ))),
            TransitionPolicy::Permissive => {
                tracing::warn!(
                    "Order {} status change {} -> {} is outside the order lifecycle",
                    order_id,
                    current,
                    next
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_labels_case_insensitively() {
        assert_eq!(OrderStatus::parse("shipped"), OrderStatus::Shipped);
        assert_eq!(OrderStatus::parse(" Cancelled "), OrderStatus::Cancelled);
        assert_eq!(
            OrderStatus::parse("Out for delivery"),
            OrderStatus::Custom("Out for delivery".to_string())
        );
        assert_eq!(OrderStatus::Pending.to_string(), "Pending");
    }

    #[test]
    fn follows_the_order_lifecycle() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(&Confirmed));
        assert!(Confirmed.can_transition_to(&Shipped));
        assert!(Shipped.can_transition_to(&Delivered));
        assert!(Shipped.can_transition_to(&Cancelled));

        assert!(!Delivered.can_transition_to(&Cancelled));
        assert!(!Pending.can_transition_to(&Delivered));
        assert!(!Cancelled.can_transition_to(&Pending));
        assert!(!Pending.can_transition_to(&Custom("Packed".into())));
    }

    #[test]
    fn strict_policy_rejects_and_permissive_allows() {
        let current = OrderStatus::Delivered;
        let next = OrderStatus::Pending;

        let err = TransitionPolicy::Strict
            .check(1, Some(&current), &next)
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert!(
            TransitionPolicy::Permissive
                .check(1, Some(&current), &next)
                .is_ok()
        );
        assert!(TransitionPolicy::Strict.check(1, None, &next).is_ok());
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("Strict".parse::<TransitionPolicy>().unwrap(), TransitionPolicy::Strict);
        assert_eq!(
            "permissive".parse::<TransitionPolicy>().unwrap(),
            TransitionPolicy::Permissive
        );
        assert!("lenient".parse::<TransitionPolicy>().is_err());
    }

    #[test]
    fn serializes_as_plain_label() {
        let json = serde_json::to_string(&OrderStatus::Custom("Packed".into())).unwrap();
        assert_eq!(json, "\"Packed\"");
        let parsed: OrderStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(parsed, OrderStatus::Confirmed);
    }
}
