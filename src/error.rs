//! Error types for the entitlement gate.
//!
//! This module defines all error types that can occur during entitlement,
//! quota, and payment operations. All errors implement the standard
//! [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Errors vs. decisions
//!
//! Business-rule outcomes - "subscription not active", "monthly limit
//! reached", "content rejected" - are **not** errors. They are returned as
//! structured decision values ([`crate::entitlement::EntitlementDecision`],
//! [`crate::quota::QuotaDecision`], [`crate::service::PublishOutcome`]) and
//! rendered directly to the end user. The variants here cover the cases the
//! caller cannot recover from by upgrading a plan or editing content:
//! invalid input, misconfiguration, infrastructure failures, and payment
//! protocol violations.
//!
//! # Examples
//!
//! ```
//! use entitlement_gate::error::{EntitlementError, Result};
//!
//! fn require_configured(secret: Option<&str>) -> Result<&str> {
//!     secret.ok_or(EntitlementError::PaymentsDisabled)
//! }
//! ```

use thiserror::Error;

/// Result type alias for entitlement-gate operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, EntitlementError>;

/// Errors that can occur in the entitlement gate.
///
/// Infrastructure failures ([`StoreError`](Self::StoreError),
/// [`HttpError`](Self::HttpError)) must be surfaced to the end user as a
/// generic retry-later message - never interpreted as "quota exceeded" or
/// "payment verified" by a permissive fallback.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// An identifier failed validation.
    ///
    /// Identifiers (user, plan, course, order) must be non-empty, at most
    /// 64 characters, and contain only alphanumeric characters, hyphens,
    /// and underscores.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A plan or course definition failed catalog validation.
    ///
    /// Raised when loading the catalog: duplicate ids, a non-positive
    /// duration, a negative price, or more than one currency in the table.
    #[error("invalid catalog entry: {0}")]
    CatalogError(String),

    /// The referenced plan does not exist in the catalog.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// The referenced course does not exist in the catalog.
    #[error("unknown course: {0}")]
    UnknownCourse(String),

    /// The purchase target is not a legal target for this caller.
    ///
    /// Covers free plans (which never go through the payment lifecycle)
    /// and plans scoped to a different role than the buyer's.
    #[error("invalid purchase target: {0}")]
    InvalidPurchaseTarget(String),

    /// Purchase flows are disabled because no gateway secret is configured.
    ///
    /// Checked up front, before any order is created. A deployment without
    /// gateway credentials degrades to "payments disabled" rather than
    /// failing late in the checkout flow.
    #[error("payments are not configured")]
    PaymentsDisabled,

    /// The gateway configuration is present but invalid.
    #[error("invalid gateway configuration: {0}")]
    ConfigError(String),

    /// The payment gateway rejected or failed the order-creation call.
    ///
    /// No local state is created when this occurs; the client may retry.
    #[error("payment initiation failed: {0}")]
    GatewayError(String),

    /// HTTP request to the payment gateway failed.
    ///
    /// Wraps [`reqwest::Error`]: timeouts, connection refused, DNS and TLS
    /// failures. Retry with backoff at the caller's discretion.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// No order exists with the given id.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// The order is already in a terminal failure state.
    ///
    /// A `failed` or `cancelled` order cannot be verified. Re-delivery of a
    /// callback for an already-`verified` order is *not* this error - it is
    /// an idempotent success.
    #[error("order already terminal: {0}")]
    OrderAlreadyTerminal(String),

    /// The callback signature did not match.
    ///
    /// Deliberately carries no detail: this is the boundary an attacker
    /// would probe, so the client-facing message stays vague. Full context
    /// (minus the expected signature) is audit-logged server-side.
    #[error("payment verification failed")]
    VerificationFailed,

    /// The underlying document store failed.
    #[error("storage error: {0}")]
    StoreError(String),
}
