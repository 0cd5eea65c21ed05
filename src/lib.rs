//! Entitlement Gate: subscription, quota, and payment enforcement for a
//! multi-role content platform.
//!
//! Every professional role on the platform - teacher, artist, director,
//! doctor, astrologer - creates and publishes resources under a
//! subscription plan with per-period caps. This crate is the one place
//! those rules are enforced:
//!
//! - **Entitlement gate**: coarse check that a subscription is `active`
//!   or `trial`, with lazy expiry correction on read
//! - **Quota enforcement**: per-`(user, kind, period)` counters compared
//!   against plan caps, committed atomically only after the guarded
//!   write confirmed
//! - **Payment lifecycle**: gateway order creation and HMAC-verified
//!   callbacks with exactly-once settlement and idempotent re-delivery
//! - **Role unlock**: verified course purchases granting additional
//!   roles, monotonically and idempotently
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  limit_check / guarded_create   ┌────────────────────┐
//! │  API layer   │────────────────────────────────►│ EntitlementService │
//! │  (per role)  │  create_order / verify_payment  │      (facade)      │
//! └──────────────┘                                 └────┬──────────┬────┘
//!                       gate -> quota -> safety -> write│          │
//!                ┌──────────────────────────────────────┘          │
//!                ▼                                                 ▼
//!        ┌───────────────┐                               ┌───────────────┐
//!        │ Gate / Quota  │                               │ PaymentOrders │
//!        │  enforcement  │                               │  + HMAC check │
//!        └───────┬───────┘                               └───────┬───────┘
//!                │        atomic increments,                     │
//!                │        conditional writes                     │
//!                ▼                                                ▼
//!        ┌─────────────────────────────────────────────────────────┐
//!        │                     Document store                      │
//!        └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use entitlement_gate::{
//!     catalog::{PlanCatalog, ResourceKind},
//!     safety::KeywordValidator,
//!     service::EntitlementService,
//!     store::{InMemoryStore, UserId},
//! };
//!
//! # async fn example() -> entitlement_gate::error::Result<()> {
//! let catalog = Arc::new(PlanCatalog::from_toml(
//!     r#"
//!     [[plans]]
//!     id = "astro-basic"
//!     role = "astrologer"
//!     name = "Astrologer Basic"
//!     price = "499.00"
//!     currency = "INR"
//!     duration_days = 30
//!
//!     [plans.usage_limits]
//!     post = 3
//!     "#,
//! )?);
//!
//! let store = Arc::new(InMemoryStore::new());
//! let service = EntitlementService::new(
//!     store,
//!     catalog,
//!     Arc::new(KeywordValidator::default()),
//! );
//!
//! let user = UserId::new("user-1")?;
//! let check = service.limit_check(&user, ResourceKind::Post).await?;
//! println!("can publish: {}", check.can_create);
//! # Ok(())
//! # }
//! ```
//!
//! # Enforcement pipeline
//!
//! A guarded action runs: entitlement gate -> role/kind mapping ->
//! quota decision -> content safety (publish kinds only) -> the caller's
//! durable write -> counter commit. Denials at any step are structured
//! results with precise user-facing messages, not errors; the counter is
//! only touched after the write confirmed, so rejected or failed actions
//! never consume quota.
//!
//! # Payments
//!
//! Purchase flows exist only when gateway credentials are configured
//! ([`payment::GatewayConfig::from_env`] returning `None` disables them
//! up front). The gateway callback is verified by recomputing
//! HMAC-SHA256 over `"{gateway_order_id}|{gateway_payment_id}"` with the
//! server-held secret and comparing in constant time. A verified order
//! settles exactly once; gateways re-deliver callbacks, and re-delivery
//! returns the original outcome without re-applying side effects.
//!
//! # Module organization
//!
//! - [`catalog`]: plans, courses, roles, and resource kinds
//! - [`subscription`]: per-user subscription state with lazy expiry
//! - [`entitlement`]: the coarse gate
//! - [`quota`]: period keys, counters, and quota decisions
//! - [`safety`]: content safety validation seam
//! - [`payment`]: order lifecycle, gateway client, callback signatures
//! - [`roles`]: role unlocking and dashboard redirects
//! - [`store`]: document-store contract + in-memory reference
//! - [`service`]: the facade the API layer calls
//! - [`audit`]: structured audit logging
//! - [`error`]: error types

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod audit;
pub mod catalog;
pub mod entitlement;
pub mod error;
pub mod payment;
pub mod quota;
pub mod roles;
pub mod safety;
pub mod service;
pub mod store;
pub mod subscription;

pub use error::{EntitlementError, Result};
pub use service::EntitlementService;
