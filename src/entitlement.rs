//! Coarse entitlement gate.
//!
//! Gates entire feature surfaces (upload, publish, create) on current
//! subscription state, independent of the fine-grained per-kind quotas.
//! Fails closed: a user with no subscription record is not entitled.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    store::{EntitlementStore, UserId},
    subscription::{SubscriptionState, SubscriptionStatus},
};

/// Decision produced by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EntitlementDecision {
    /// Subscription is active or in trial.
    Entitled {
        /// The qualifying status.
        status: SubscriptionStatus,
    },
    /// No subscription record exists for the user (fail closed).
    NoSubscription,
    /// A record exists but its status does not qualify.
    NotActive {
        /// The disqualifying status.
        status: SubscriptionStatus,
    },
    /// The subscription lapsed past its expiry.
    Expired,
}

impl EntitlementDecision {
    /// True when gated features may be used.
    #[must_use]
    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Entitled { .. })
    }

    /// User-facing denial message. Distinct from quota denials so the UI
    /// can route the user to purchase rather than to "wait for next
    /// period".
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Entitled { .. } => None,
            Self::NoSubscription | Self::NotActive { .. } => {
                Some("An active subscription is required for this feature")
            }
            Self::Expired => Some("Your subscription has expired. Renew to continue."),
        }
    }
}

/// Result of a gate check, carrying the loaded (and possibly corrected)
/// subscription state for downstream quota resolution.
#[derive(Debug, Clone)]
pub struct EntitlementCheck {
    /// The decision.
    pub decision: EntitlementDecision,
    /// The subscription record as of this check, after lazy correction.
    pub state: Option<SubscriptionState>,
}

/// The entitlement gate.
#[derive(Clone)]
pub struct EntitlementGate {
    store: Arc<dyn EntitlementStore>,
}

impl std::fmt::Debug for EntitlementGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementGate").finish_non_exhaustive()
    }
}

impl EntitlementGate {
    /// Creates the gate over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// Checks whether the user may use gated features right now.
    ///
    /// Loads the subscription record and applies lazy expiry: when
    /// `expires_at` is in the past, the record is corrected to `expired`
    /// and written back so the stale status is not reused by other
    /// readers - this check and every subsequent one deny.
    ///
    /// # Errors
    ///
    /// Returns error only on store failure. Absence of a record is not an
    /// error; it is a `NoSubscription` denial.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn check(&self, user: &UserId) -> Result<EntitlementCheck> {
        let Some(mut state) = self.store.subscription(user).await? else {
            return Ok(EntitlementCheck {
                decision: EntitlementDecision::NoSubscription,
                state: None,
            });
        };

        let now = Utc::now();
        if state.is_lapsed(now) && state.status != SubscriptionStatus::Expired {
            debug!(user = %user, "correcting lapsed subscription to expired");
            state.expire();
            self.store.save_subscription(user, &state).await?;
        }

        let decision = if state.is_entitled(now) {
            EntitlementDecision::Entitled { status: state.status }
        } else {
            match state.status {
                SubscriptionStatus::Expired => EntitlementDecision::Expired,
                status => EntitlementDecision::NotActive { status },
            }
        };

        Ok(EntitlementCheck { decision, state: Some(state) })
    }
}
