//! End-to-end enforcement scenarios through the service facade.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{Duration, Utc};
use entitlement_gate::{
    catalog::{Course, CourseId, Plan, PlanCatalog, PlanId, ResourceKind, Role},
    error::EntitlementError,
    payment::{
        BillingCycle, CallbackParams, CallbackSigner, CheckoutInfo, CreateOrderParams,
        GatewayConfig, PurchaseTarget, StaticGateway,
    },
    safety::KeywordValidator,
    service::{DenialReason, EntitlementService, PublishOutcome},
    store::{EntitlementStore, InMemoryStore, UserId},
    subscription::{SubscriptionState, SubscriptionStatus},
};

const GATEWAY_SECRET: &str = "integration-secret";

fn catalog() -> Arc<PlanCatalog> {
    let astro = Plan {
        id: PlanId::new("astro-basic").unwrap(),
        role: Role::Astrologer,
        name: "Astrologer Basic".to_owned(),
        price: rust_decimal::Decimal::new(49900, 2),
        yearly_price: None,
        currency: "INR".to_owned(),
        duration_days: 30,
        features: vec!["3 posts per month".to_owned()],
        usage_limits: BTreeMap::from([(ResourceKind::Post, 3)]),
    };
    let course = Course {
        id: CourseId::new("c1").unwrap(),
        name: "Astrology Certification".to_owned(),
        price: rust_decimal::Decimal::new(249900, 2),
        currency: "INR".to_owned(),
        grants_role: Some(Role::Astrologer),
    };
    Arc::new(PlanCatalog::new(vec![astro], vec![course]).unwrap())
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        key_id: "key_test".to_owned(),
        secret: GATEWAY_SECRET.to_owned(),
        base_url: "https://gateway.example.com/v1".to_owned(),
        timeout_secs: 30,
    }
}

fn service() -> (EntitlementService, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let service = EntitlementService::new(
        store.clone(),
        catalog(),
        Arc::new(KeywordValidator::default()),
    )
    .with_payments(store.clone(), Arc::new(StaticGateway::new()), &gateway_config());
    (service, store)
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

async fn activate(store: &InMemoryStore, u: &UserId, role: Role, plan: &str) {
    store
        .save_subscription(
            u,
            &SubscriptionState {
                role,
                plan_id: Some(PlanId::new(plan).unwrap()),
                status: SubscriptionStatus::Active,
                expires_at: Some(Utc::now() + Duration::days(30)),
            },
        )
        .await
        .unwrap();
}

fn valid_callback(info: &CheckoutInfo, payment_id: &str) -> CallbackParams {
    let signer = CallbackSigner::new(GATEWAY_SECRET);
    CallbackParams {
        order_id: info.order_id.clone(),
        gateway_order_id: info.gateway_order_id.clone(),
        gateway_payment_id: payment_id.to_owned(),
        signature: signer.sign(&info.gateway_order_id, payment_id),
    }
}

// Scenario A: a plan allowing 3 posts per month admits exactly 3
// publishes; the 4th is a quota denial with zero additional writes.
#[tokio::test]
async fn test_monthly_post_limit_enforced_end_to_end() {
    let (service, store) = service();
    let u = user("astrologer-1");
    activate(&store, &u, Role::Astrologer, "astro-basic").await;

    let mut writes = 0u32;
    for i in 0..3 {
        let outcome = service
            .guarded_create(&u, ResourceKind::Post, "Weekly horoscope", || {
                writes += 1;
                async move { Ok(format!("post-{i}")) }
            })
            .await
            .unwrap();
        assert!(outcome.is_created(), "publish {i} should succeed");
    }
    assert_eq!(writes, 3);

    let outcome = service
        .guarded_create(&u, ResourceKind::Post, "One more", || {
            writes += 1;
            async move { Ok("post-4".to_owned()) }
        })
        .await
        .unwrap();

    let Some(DenialReason::Quota(decision)) = outcome.denial() else {
        panic!("expected a quota denial, got {outcome:?}");
    };
    assert_eq!(decision.limit, Some(3));
    assert_eq!(decision.used, 3);
    assert_eq!(writes, 3, "no document write may happen after the limit");

    // The limit-check endpoint reports the same numbers.
    let check = service.limit_check(&u, ResourceKind::Post).await.unwrap();
    assert!(!check.can_create);
    assert!(check.error.unwrap().contains("monthly limit of 3"));
}

// Scenario B: a trial that lapsed yesterday is denied on the very next
// check and the stored record is corrected to expired.
#[tokio::test]
async fn test_lapsed_trial_denied_and_corrected() {
    let (service, store) = service();
    let u = user("astrologer-2");
    store
        .save_subscription(
            &u,
            &SubscriptionState {
                role: Role::Astrologer,
                plan_id: Some(PlanId::new("astro-basic").unwrap()),
                status: SubscriptionStatus::Trial,
                expires_at: Some(Utc::now() - Duration::days(1)),
            },
        )
        .await
        .unwrap();

    let outcome = service
        .guarded_create(&u, ResourceKind::Post, "content", || async {
            Ok(())
        })
        .await
        .unwrap();
    assert!(matches!(outcome.denial(), Some(DenialReason::Entitlement(_))));

    let stored = store.subscription(&u).await.unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Expired);
}

// Scenario C: a course purchase with a tampered callback signature
// fails verification, the order becomes failed, and no role is
// unlocked.
#[tokio::test]
async fn test_tampered_course_callback_unlocks_nothing() {
    let (service, store) = service();
    let u = user("buyer-1");

    let info = service
        .create_order(CreateOrderParams {
            user_id: u.clone(),
            target: PurchaseTarget::Course { course_id: CourseId::new("c1").unwrap() },
        })
        .await
        .unwrap();
    assert_eq!(info.amount, rust_decimal::Decimal::new(249900, 2));

    let mut params = valid_callback(&info, "pay_1");
    let tampered = CallbackSigner::new("wrong-secret").sign(&info.gateway_order_id, "pay_1");
    params.signature = tampered;

    let result = service.verify_payment(params).await;
    assert!(matches!(result.unwrap_err(), EntitlementError::VerificationFailed));

    let order = store.order(&info.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, entitlement_gate::payment::OrderStatus::Failed);
    assert!(!store.has_role_unlock(&u, Role::Astrologer).await.unwrap());
}

// A verified subscription purchase entitles the user; re-delivery of
// the same callback extends nothing.
#[tokio::test]
async fn test_purchase_then_publish_flow() {
    let (service, store) = service();
    let u = user("new-astrologer");

    // Unpaid user is gated out.
    let check = service.limit_check(&u, ResourceKind::Post).await.unwrap();
    assert!(!check.can_create);

    let info = service
        .create_order(CreateOrderParams {
            user_id: u.clone(),
            target: PurchaseTarget::Subscription {
                plan_id: PlanId::new("astro-basic").unwrap(),
                billing_cycle: BillingCycle::Monthly,
            },
        })
        .await
        .unwrap();

    let first = service.verify_payment(valid_callback(&info, "pay_9")).await.unwrap();
    assert!(!first.already_processed);

    let expires = store.subscription(&u).await.unwrap().unwrap().expires_at;

    // Gateway re-delivery: same success, no second extension.
    let second = service.verify_payment(valid_callback(&info, "pay_9")).await.unwrap();
    assert!(second.already_processed);
    assert_eq!(store.subscription(&u).await.unwrap().unwrap().expires_at, expires);

    // Entitled now; quota numbers come from the purchased plan.
    let check = service.limit_check(&u, ResourceKind::Post).await.unwrap();
    assert!(check.can_create);
    assert_eq!(check.quota.unwrap().limit, Some(3));

    let outcome = service
        .guarded_create(&u, ResourceKind::Post, "First forecast", || async {
            Ok(())
        })
        .await
        .unwrap();
    assert!(outcome.is_created());
}

// A verified course purchase unlocks the granted role exactly once and
// reports the dashboard redirect role.
#[tokio::test]
async fn test_course_purchase_unlocks_role_once() {
    let (service, store) = service();
    let u = user("student-1");

    let info = service
        .create_order(CreateOrderParams {
            user_id: u.clone(),
            target: PurchaseTarget::Course { course_id: CourseId::new("c1").unwrap() },
        })
        .await
        .unwrap();

    let verification = service.verify_payment(valid_callback(&info, "pay_2")).await.unwrap();
    assert_eq!(verification.outcome.role_unlocked, Some(Role::Astrologer));
    assert_eq!(verification.outcome.redirect_role, Some(Role::Astrologer));
    assert_eq!(
        entitlement_gate::roles::dashboard_for(Role::Astrologer),
        "/dashboard/astrologer"
    );

    // Re-delivery returns the stored outcome without a second unlock.
    let replay = service.verify_payment(valid_callback(&info, "pay_2")).await.unwrap();
    assert!(replay.already_processed);
    assert_eq!(replay.outcome.redirect_role, Some(Role::Astrologer));
    assert_eq!(store.role_unlocks(&u).await.unwrap().len(), 1);
}

// Content safety rejections and failed writes never consume quota.
#[tokio::test]
async fn test_rejected_content_keeps_quota_intact() {
    let (service, store) = service();
    let u = user("astrologer-3");
    activate(&store, &u, Role::Astrologer, "astro-basic").await;

    let outcome = service
        .guarded_create(&u, ResourceKind::Post, "Buy now for a guaranteed cure!", || async {
            Ok(())
        })
        .await
        .unwrap();
    assert!(matches!(outcome.denial(), Some(DenialReason::Content { .. })));

    let result: entitlement_gate::Result<PublishOutcome<()>> = service
        .guarded_create(&u, ResourceKind::Post, "clean text", || async {
            Err(EntitlementError::StoreError("replica timeout".to_owned()))
        })
        .await;
    assert!(result.is_err());

    let check = service.limit_check(&u, ResourceKind::Post).await.unwrap();
    assert_eq!(check.quota.unwrap().remaining, Some(3));
}
