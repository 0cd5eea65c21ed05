//! Per-user subscription state.
//!
//! One record per user, owned by that user, mutated only by payment
//! settlement or an administrative override. Expiry is lazy: a record
//! whose `expires_at` has passed is treated as expired on the very next
//! read - no background sweep exists or is needed for correctness.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Plan, PlanId, Role};

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// Trial period.
    Trial,
    /// Never activated, or deactivated by an administrator.
    Inactive,
    /// Lapsed past `expires_at`.
    Expired,
}

impl SubscriptionStatus {
    /// Returns the wire/storage name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trial => "trial",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's subscription record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionState {
    /// Role this subscription covers.
    pub role: Role,
    /// Current plan. `None` is the default free tier.
    pub plan_id: Option<PlanId>,
    /// Current status.
    pub status: SubscriptionStatus,
    /// Entitlement expiry. `None` means no time bound.
    pub expires_at: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// The default free tier for a role: no plan, inactive, no expiry.
    #[must_use]
    pub fn free_tier(role: Role) -> Self {
        Self { role, plan_id: None, status: SubscriptionStatus::Inactive, expires_at: None }
    }

    /// Pure entitlement decision over this record.
    ///
    /// True iff status is `active` or `trial` and `expires_at` is absent
    /// or in the future. This is the sole condition the entitlement gate
    /// checks.
    #[must_use]
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, SubscriptionStatus::Active | SubscriptionStatus::Trial)
            && !self.is_lapsed(now)
    }

    /// True if `expires_at` is set and in the past.
    #[must_use]
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Marks the record expired (lazy correction on read).
    pub fn expire(&mut self) {
        self.status = SubscriptionStatus::Expired;
    }

    /// Applies a settled plan purchase.
    ///
    /// A renewal of the same plan whose expiry is still in the future
    /// extends from the current expiry; anything else anchors at `now`.
    /// `months` is 1 for a monthly purchase and 12 for yearly.
    pub fn apply_settlement(&mut self, plan: &Plan, months: u32, now: DateTime<Utc>) {
        let anchor = match self.expires_at {
            Some(current) if current > now && self.plan_id.as_ref() == Some(&plan.id) => current,
            _ => now,
        };
        let granted = Duration::days(i64::from(plan.duration_days) * i64::from(months));
        self.role = plan.role;
        self.plan_id = Some(plan.id.clone());
        self.status = SubscriptionStatus::Active;
        self.expires_at = Some(anchor + granted);
    }
}
