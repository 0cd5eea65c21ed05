//! Payment order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    catalog::{CourseId, PlanId, Role},
    error::Result,
    store::UserId,
};

/// Unique identifier for a payment order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order id after validation.
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty, exceeds 64 characters, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > 64 {
            return Err(crate::error::EntitlementError::InvalidId(
                "order_id must be 1-64 characters".to_owned(),
            ));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(crate::error::EntitlementError::InvalidId(
                "order_id can only contain alphanumeric characters, hyphens, and underscores"
                    .to_owned(),
            ));
        }
        Ok(Self(id))
    }

    /// Generates a fresh random order id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("order_{}", Uuid::new_v4().simple()))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Billing cycle for a subscription purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    /// One plan period.
    Monthly,
    /// Twelve plan periods; price comes from plan data.
    Yearly,
}

impl BillingCycle {
    /// Number of plan periods this cycle settles.
    #[must_use]
    pub const fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
        }
    }
}

/// What an order pays for.
///
/// The billing cycle exists only for subscription purchases, so it lives
/// inside the variant rather than as a nullable field on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PurchaseTarget {
    /// A role-scoped subscription plan.
    Subscription {
        /// Target plan.
        plan_id: PlanId,
        /// Monthly or yearly.
        billing_cycle: BillingCycle,
    },
    /// A one-off course purchase.
    Course {
        /// Target course.
        course_id: CourseId,
    },
}

/// Order lifecycle status.
///
/// `created -> verified` is the only success path and may happen exactly
/// once per order. `failed` and `cancelled` are terminal; records never
/// mutate after reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting a gateway callback. Inert if the checkout is abandoned.
    Created,
    /// Callback signature verified; side effects applied.
    Verified,
    /// Callback signature rejected.
    Failed,
    /// Aborted by the user before any callback.
    Cancelled,
}

impl OrderStatus {
    /// Returns the wire/storage name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effects applied when an order was verified.
///
/// Stored on the order so that a re-delivered callback can return the
/// original outcome without re-applying anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedOutcome {
    /// Role newly unlocked by a course purchase.
    pub role_unlocked: Option<Role>,
    /// Role whose dashboard the client should redirect to.
    pub redirect_role: Option<Role>,
}

/// A payment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Unique order identifier (also the gateway receipt reference).
    pub id: OrderId,
    /// Buyer.
    pub user_id: UserId,
    /// What is being purchased.
    pub target: PurchaseTarget,
    /// Charge amount, minor-unit precision.
    pub amount: Decimal,
    /// Currency code (ISO 4217).
    pub currency: String,
    /// Gateway-minted order id, returned at order creation.
    pub gateway_order_id: String,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Outcome of the verified transition, if it happened.
    #[serde(default)]
    pub outcome: Option<VerifiedOutcome>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_generate_is_valid() {
        let id = OrderId::generate();
        assert!(id.as_str().starts_with("order_"));
        assert!(OrderId::new(id.as_str()).is_ok());
    }

    #[test]
    fn test_order_id_rejects_invalid() {
        assert!(OrderId::new("").is_err());
        assert!(OrderId::new("order/1").is_err());
        assert!(OrderId::new("a".repeat(65)).is_err());
    }

    #[test]
    fn test_billing_cycle_months() {
        assert_eq!(BillingCycle::Monthly.months(), 1);
        assert_eq!(BillingCycle::Yearly.months(), 12);
    }

    #[test]
    fn test_purchase_target_serialization() {
        let target = PurchaseTarget::Subscription {
            plan_id: PlanId::new("astro-basic").unwrap(),
            billing_cycle: BillingCycle::Yearly,
        };
        let json = serde_json::to_string(&target).unwrap();
        assert!(json.contains("\"kind\":\"subscription\""));
        assert!(json.contains("\"billing_cycle\":\"yearly\""));

        let course = PurchaseTarget::Course { course_id: CourseId::new("c1").unwrap() };
        let json = serde_json::to_string(&course).unwrap();
        assert!(json.contains("\"kind\":\"course\""));
    }

    #[test]
    fn test_order_status_serialization() {
        assert_eq!(serde_json::to_string(&OrderStatus::Verified).unwrap(), "\"verified\"");
        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }
}
