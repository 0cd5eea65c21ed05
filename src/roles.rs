//! Role unlocking.
//!
//! A verified course purchase may grant the buyer an additional platform
//! role. Unlocking is monotonic - a role once unlocked is never revoked
//! here - and idempotent, because payment gateways re-deliver callbacks.
//!
//! [`RoleUnlocks::unlock`] is deliberately crate-private: the only legal
//! caller is the verified-transition path of the payment lifecycle, which
//! preserves the invariant that roles are unlocked exclusively through a
//! verified payment.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    catalog::{CourseId, Role},
    error::Result,
    store::{EntitlementStore, UserId},
};

/// A recorded role unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUnlockRecord {
    /// User holding the role.
    pub user_id: UserId,
    /// Unlocked role.
    pub role: Role,
    /// Course whose purchase granted the role.
    pub source_course_id: CourseId,
    /// When the unlock happened.
    pub unlocked_at: DateTime<Utc>,
}

/// Outcome of an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockResult {
    /// True when the user already held the role (no-op success).
    pub already_unlocked: bool,
    /// Role whose dashboard the client should redirect to.
    pub redirect_role: Role,
}

/// Canonical dashboard path for a role.
///
/// A fixed lookup table, not business logic: the post-purchase redirect
/// target is purely a function of the unlocked role.
#[must_use]
pub const fn dashboard_for(role: Role) -> &'static str {
    match role {
        Role::Teacher => "/dashboard/teacher",
        Role::Artist => "/dashboard/artist",
        Role::Director => "/dashboard/director",
        Role::Doctor => "/dashboard/doctor",
        Role::Astrologer => "/dashboard/astrologer",
    }
}

/// Role unlock service.
#[derive(Clone)]
pub struct RoleUnlocks {
    store: Arc<dyn EntitlementStore>,
}

impl std::fmt::Debug for RoleUnlocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleUnlocks").finish_non_exhaustive()
    }
}

impl RoleUnlocks {
    /// Creates the service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// Grants `role` to `user`, recording the source course.
    ///
    /// Idempotent: re-invocation for a role the user already holds
    /// returns `already_unlocked = true` without inserting a duplicate.
    ///
    /// # Errors
    ///
    /// Returns error only on store failure.
    pub(crate) async fn unlock(
        &self,
        user: &UserId,
        role: Role,
        source_course_id: &CourseId,
    ) -> Result<UnlockResult> {
        let record = RoleUnlockRecord {
            user_id: user.clone(),
            role,
            source_course_id: source_course_id.clone(),
            unlocked_at: Utc::now(),
        };
        let inserted = self.store.insert_role_unlock(&record).await?;
        if inserted {
            info!(user = %user, role = %role, course = %source_course_id, "role unlocked");
        }
        Ok(UnlockResult { already_unlocked: !inserted, redirect_role: role })
    }
}
