//! In-memory reference store.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use super::{EntitlementStore, UserId};
use crate::{
    catalog::ResourceKind,
    error::{EntitlementError, Result},
    payment::{OrderId, OrderStatus, PaymentOrder, VerifiedOutcome},
    quota::PeriodKey,
    roles::RoleUnlockRecord,
    subscription::SubscriptionState,
};

/// In-memory [`EntitlementStore`] for tests and local development.
///
/// All mutations happen under a single write lock per collection, which
/// makes `increment_usage` and `transition_order` atomic - the same
/// guarantees a real implementation must provide through its provider's
/// atomic-increment and conditional-write primitives.
///
/// Wraps its data in [`Arc`] for cheap cloning.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    subscriptions: RwLock<HashMap<String, SubscriptionState>>,
    counters: RwLock<HashMap<(String, ResourceKind, String), u64>>,
    orders: RwLock<HashMap<String, PaymentOrder>>,
    unlocks: RwLock<Vec<RoleUnlockRecord>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> EntitlementError {
        EntitlementError::StoreError("store lock poisoned".to_owned())
    }
}

#[async_trait]
impl EntitlementStore for InMemoryStore {
    async fn subscription(&self, user: &UserId) -> Result<Option<SubscriptionState>> {
        let subs = self.inner.subscriptions.read().map_err(|_| Self::lock_err())?;
        Ok(subs.get(user.as_str()).cloned())
    }

    async fn save_subscription(&self, user: &UserId, state: &SubscriptionState) -> Result<()> {
        let mut subs = self.inner.subscriptions.write().map_err(|_| Self::lock_err())?;
        subs.insert(user.as_str().to_owned(), state.clone());
        Ok(())
    }

    async fn usage_count(
        &self,
        user: &UserId,
        kind: ResourceKind,
        period: &PeriodKey,
    ) -> Result<u64> {
        let counters = self.inner.counters.read().map_err(|_| Self::lock_err())?;
        let key = (user.as_str().to_owned(), kind, period.as_str().to_owned());
        Ok(counters.get(&key).copied().unwrap_or(0))
    }

    async fn increment_usage(
        &self,
        user: &UserId,
        kind: ResourceKind,
        period: &PeriodKey,
    ) -> Result<u64> {
        let mut counters = self.inner.counters.write().map_err(|_| Self::lock_err())?;
        let key = (user.as_str().to_owned(), kind, period.as_str().to_owned());
        let count = counters.entry(key).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn order(&self, id: &OrderId) -> Result<Option<PaymentOrder>> {
        let orders = self.inner.orders.read().map_err(|_| Self::lock_err())?;
        Ok(orders.get(id.as_str()).cloned())
    }

    async fn insert_order(&self, order: &PaymentOrder) -> Result<()> {
        let mut orders = self.inner.orders.write().map_err(|_| Self::lock_err())?;
        orders.insert(order.id.as_str().to_owned(), order.clone());
        Ok(())
    }

    async fn transition_order(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let mut orders = self.inner.orders.write().map_err(|_| Self::lock_err())?;
        let order = orders
            .get_mut(id.as_str())
            .ok_or_else(|| EntitlementError::OrderNotFound(id.to_string()))?;
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        Ok(true)
    }

    async fn record_order_outcome(&self, id: &OrderId, outcome: &VerifiedOutcome) -> Result<()> {
        let mut orders = self.inner.orders.write().map_err(|_| Self::lock_err())?;
        let order = orders
            .get_mut(id.as_str())
            .ok_or_else(|| EntitlementError::OrderNotFound(id.to_string()))?;
        order.outcome = Some(outcome.clone());
        Ok(())
    }

    async fn role_unlocks(&self, user: &UserId) -> Result<Vec<RoleUnlockRecord>> {
        let unlocks = self.inner.unlocks.read().map_err(|_| Self::lock_err())?;
        Ok(unlocks.iter().filter(|r| &r.user_id == user).cloned().collect())
    }

    async fn insert_role_unlock(&self, record: &RoleUnlockRecord) -> Result<bool> {
        let mut unlocks = self.inner.unlocks.write().map_err(|_| Self::lock_err())?;
        if unlocks.iter().any(|r| r.user_id == record.user_id && r.role == record.role) {
            return Ok(false);
        }
        unlocks.push(record.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::catalog::{CourseId, Role};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_counter_starts_absent_and_increments() {
        let store = InMemoryStore::new();
        let u = user("u1");
        let period = PeriodKey::for_kind(ResourceKind::Post, Utc::now());

        assert_eq!(store.usage_count(&u, ResourceKind::Post, &period).await.unwrap(), 0);
        assert_eq!(store.increment_usage(&u, ResourceKind::Post, &period).await.unwrap(), 1);
        assert_eq!(store.increment_usage(&u, ResourceKind::Post, &period).await.unwrap(), 2);
        assert_eq!(store.usage_count(&u, ResourceKind::Post, &period).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_counters_isolated_by_kind_and_user() {
        let store = InMemoryStore::new();
        let period = PeriodKey::for_kind(ResourceKind::Post, Utc::now());

        store.increment_usage(&user("u1"), ResourceKind::Post, &period).await.unwrap();

        assert_eq!(
            store.usage_count(&user("u2"), ResourceKind::Post, &period).await.unwrap(),
            0
        );
        assert_eq!(
            store.usage_count(&user("u1"), ResourceKind::Article, &period).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_transition_order_precondition() {
        let store = InMemoryStore::new();
        let order = PaymentOrder {
            id: OrderId::new("o1").unwrap(),
            user_id: user("u1"),
            target: crate::payment::PurchaseTarget::Course {
                course_id: CourseId::new("c1").unwrap(),
            },
            amount: rust_decimal::Decimal::new(100, 0),
            currency: "INR".to_owned(),
            gateway_order_id: "gw_1".to_owned(),
            status: OrderStatus::Created,
            outcome: None,
            created_at: Utc::now(),
        };
        store.insert_order(&order).await.unwrap();

        // First transition wins, second fails its precondition.
        assert!(
            store
                .transition_order(&order.id, OrderStatus::Created, OrderStatus::Verified)
                .await
                .unwrap()
        );
        assert!(
            !store
                .transition_order(&order.id, OrderStatus::Created, OrderStatus::Verified)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let store = InMemoryStore::new();
        let result = store
            .transition_order(
                &OrderId::new("missing").unwrap(),
                OrderStatus::Created,
                OrderStatus::Failed,
            )
            .await;
        assert!(matches!(result.unwrap_err(), EntitlementError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_role_unlock_insert_is_idempotent() {
        let store = InMemoryStore::new();
        let record = RoleUnlockRecord {
            user_id: user("u1"),
            role: Role::Astrologer,
            source_course_id: CourseId::new("c1").unwrap(),
            unlocked_at: Utc::now(),
        };

        assert!(store.insert_role_unlock(&record).await.unwrap());
        assert!(!store.insert_role_unlock(&record).await.unwrap());
        assert_eq!(store.role_unlocks(&user("u1")).await.unwrap().len(), 1);
        assert!(store.has_role_unlock(&user("u1"), Role::Astrologer).await.unwrap());
        assert!(!store.has_role_unlock(&user("u1"), Role::Doctor).await.unwrap());
    }
}
