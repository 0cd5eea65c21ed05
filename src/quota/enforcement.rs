//! Per-kind quota decisions and the post-success counter commit.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument};

use super::period::PeriodKey;
use crate::{
    catalog::{Plan, ResourceKind, UsageLimit},
    error::Result,
    store::{EntitlementStore, UserId},
};

/// Outcome of a quota check.
///
/// `allowed = false` is not an error; it is a normal decision the caller
/// renders as "limit reached, upgrade your plan". The exact numbers are
/// included so the UI can state them precisely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    /// Kind that was checked.
    pub kind: ResourceKind,
    /// Whether one more unit may be created.
    pub allowed: bool,
    /// Configured cap. `None` means unbounded.
    pub limit: Option<u64>,
    /// Units already consumed in the current period.
    pub used: u64,
    /// Units left in the current period. `None` means unbounded.
    pub remaining: Option<u64>,
    /// The period the numbers refer to.
    pub period_key: PeriodKey,
}

impl QuotaDecision {
    /// User-facing denial message, or `None` when allowed.
    #[must_use]
    pub fn denial_message(&self) -> Option<String> {
        if self.allowed {
            return None;
        }
        let limit = self.limit.unwrap_or(self.used);
        Some(format!(
            "You have reached your {} limit of {} {}s. Upgrade your plan to continue.",
            self.kind.period().display(),
            limit,
            self.kind
        ))
    }
}

/// Quota enforcement over the usage counter store.
#[derive(Clone)]
pub struct QuotaEnforcer {
    store: Arc<dyn EntitlementStore>,
}

impl std::fmt::Debug for QuotaEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaEnforcer").finish_non_exhaustive()
    }
}

impl QuotaEnforcer {
    /// Creates the enforcer over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// Decides whether `user` may create one more unit of `kind` under
    /// `plan`.
    ///
    /// A kind that is unconfigured on the plan (or explicitly unbounded)
    /// is always allowed; the counter is not even read. Otherwise the
    /// decision compares the current period's committed count against the
    /// plan cap. Must be evaluated strictly before the guarded document
    /// write.
    ///
    /// # Errors
    ///
    /// Returns error only on store failure.
    #[instrument(skip(self, plan), fields(user = %user, kind = %kind, plan = %plan.id))]
    pub async fn can_consume(
        &self,
        user: &UserId,
        kind: ResourceKind,
        plan: &Plan,
    ) -> Result<QuotaDecision> {
        let period_key = PeriodKey::for_kind(kind, Utc::now());

        match plan.limit_for(kind) {
            UsageLimit::Unbounded => Ok(QuotaDecision {
                kind,
                allowed: true,
                limit: None,
                used: 0,
                remaining: None,
                period_key,
            }),
            UsageLimit::Limited(limit) => {
                let used = self.store.usage_count(user, kind, &period_key).await?;
                let allowed = used < limit;
                if !allowed {
                    debug!(user = %user, kind = %kind, used, limit, "quota exhausted");
                }
                Ok(QuotaDecision {
                    kind,
                    allowed,
                    limit: Some(limit),
                    used,
                    remaining: Some(limit.saturating_sub(used)),
                    period_key,
                })
            }
        }
    }

    /// Commits one unit of consumption after the guarded action durably
    /// succeeded.
    ///
    /// Performs the store's atomic increment on the current period's
    /// counter and returns the post-increment count. Never call this for
    /// an action that failed or was rejected - an increment with no
    /// created resource silently shrinks the user's effective quota with
    /// no compensating action.
    ///
    /// # Errors
    ///
    /// Returns error only on store failure.
    #[instrument(skip(self), fields(user = %user, kind = %kind))]
    pub async fn commit_consumption(&self, user: &UserId, kind: ResourceKind) -> Result<u64> {
        let period_key = PeriodKey::for_kind(kind, Utc::now());
        self.store.increment_usage(user, kind, &period_key).await
    }
}
