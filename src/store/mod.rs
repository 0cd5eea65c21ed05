//! Document-store abstraction.
//!
//! The platform's backing store is a managed document database; this
//! module reduces it to the contract the entitlement subsystem actually
//! needs: load/save by key, and an atomic numeric increment scoped to a
//! single counter document. An in-memory reference implementation backs
//! the test suite and local development.

mod memory;

use async_trait::async_trait;

pub use memory::InMemoryStore;

use crate::{
    catalog::{ResourceKind, Role},
    error::{EntitlementError, Result},
    payment::{OrderId, OrderStatus, PaymentOrder, VerifiedOutcome},
    quota::PeriodKey,
    roles::RoleUnlockRecord,
    subscription::SubscriptionState,
};

/// Unique identifier for a platform user.
///
/// Always a server-side resolved identity - never anything the client
/// claims about itself beyond its verified token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id after validation.
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty, exceeds 64 characters, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > 64 {
            return Err(EntitlementError::InvalidId("user_id must be 1-64 characters".to_owned()));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(EntitlementError::InvalidId(
                "user_id can only contain alphanumeric characters, hyphens, and underscores"
                    .to_owned(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage contract for entitlement state.
///
/// Implement this against the real document database. Routing rules for
/// implementors:
///
/// - [`increment_usage`](Self::increment_usage) MUST use the provider's
///   native atomic increment (or a compare-and-swap retry loop), never an
///   unguarded read-modify-write - two requests landing in the same
///   period must not under-count.
/// - Order reads and [`transition_order`](Self::transition_order) MUST go
///   through a strongly consistent path; payment verification never
///   tolerates stale reads. Quota reads should prefer one too, but a
///   stale quota read only costs the operator some resource headroom, not money.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    // Subscription state

    /// Loads a user's subscription record.
    async fn subscription(&self, user: &UserId) -> Result<Option<SubscriptionState>>;

    /// Saves a user's subscription record.
    async fn save_subscription(&self, user: &UserId, state: &SubscriptionState) -> Result<()>;

    // Usage counters

    /// Current count for `(user, kind, period)`. Absent rows read as 0.
    async fn usage_count(
        &self,
        user: &UserId,
        kind: ResourceKind,
        period: &PeriodKey,
    ) -> Result<u64>;

    /// Atomically increments the counter, creating it at 1 if absent.
    /// Returns the post-increment count. Counter rows are never deleted;
    /// rollover simply stops reading them.
    async fn increment_usage(
        &self,
        user: &UserId,
        kind: ResourceKind,
        period: &PeriodKey,
    ) -> Result<u64>;

    // Payment orders

    /// Loads an order by id.
    async fn order(&self, id: &OrderId) -> Result<Option<PaymentOrder>>;

    /// Persists a newly created order.
    async fn insert_order(&self, order: &PaymentOrder) -> Result<()>;

    /// Transitions an order's status only if it currently equals `from`.
    ///
    /// Returns `true` if the transition was applied, `false` if the
    /// precondition did not hold (already transitioned by a concurrent
    /// callback delivery). This is the idempotency primitive that makes
    /// "exactly one `created -> verified` per order" hold.
    async fn transition_order(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;

    /// Records the side-effect outcome on an already-verified order.
    async fn record_order_outcome(&self, id: &OrderId, outcome: &VerifiedOutcome) -> Result<()>;

    // Role unlocks

    /// All roles ever unlocked for a user.
    async fn role_unlocks(&self, user: &UserId) -> Result<Vec<RoleUnlockRecord>>;

    /// Inserts an unlock record unless the role is already unlocked.
    ///
    /// Returns `true` if the record was inserted, `false` if the user
    /// already held the role (idempotent no-op; unlocks are monotonic and
    /// never revoked here).
    async fn insert_role_unlock(&self, record: &RoleUnlockRecord) -> Result<bool>;

    /// True if the user already holds the role.
    async fn has_role_unlock(&self, user: &UserId, role: Role) -> Result<bool> {
        Ok(self.role_unlocks(user).await?.iter().any(|r| r.role == role))
    }
}
