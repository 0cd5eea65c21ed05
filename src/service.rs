//! Service facade wiring the gate, quota, safety, and payment flows.
//!
//! Every gated action follows one pipeline: entitlement gate (coarse) ->
//! role/kind check -> quota decision (fine) -> content safety (publish
//! kinds only) -> the caller's durable write -> counter commit. The commit
//! fires only after the write confirmed, so a failed write never shrinks
//! the user's effective quota.
//!
//! All entry points take a server-side resolved [`UserId`]; nothing about
//! entitlement is ever trusted from the client. Client-side caches of
//! role or subscription state are UI hints, never a security boundary.

use std::{future::Future, sync::Arc};

use serde::Serialize;
use tracing::instrument;

use crate::{
    audit::{AuditEvent, AuditEventType, audit_log},
    catalog::{Plan, PlanCatalog, ResourceKind, Role},
    entitlement::{EntitlementDecision, EntitlementGate},
    error::{EntitlementError, Result},
    payment::{
        CallbackParams, CallbackVerification, CheckoutInfo, CreateOrderParams, GatewayConfig,
        PaymentGateway, PaymentOrders,
    },
    quota::{QuotaDecision, QuotaEnforcer},
    safety::ContentSafetyValidator,
    store::{EntitlementStore, UserId},
    subscription::SubscriptionState,
};

/// Why a gated action was denied.
///
/// Each variant maps to a distinct, actionable user message: entitlement
/// denials route the user to purchase, quota denials to an upgrade or the
/// next period, content denials to an edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "denied_by", rename_all = "snake_case")]
pub enum DenialReason {
    /// Coarse gate denied: no active or trial subscription.
    Entitlement(EntitlementDecision),
    /// The user's role does not author this resource kind.
    RoleMismatch {
        /// The user's role.
        role: Role,
        /// The requested kind.
        kind: ResourceKind,
    },
    /// The per-period cap is exhausted.
    Quota(QuotaDecision),
    /// The content safety validator rejected the text.
    Content {
        /// User-facing rejection reason.
        reason: String,
    },
}

impl DenialReason {
    /// User-facing message for this denial.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Entitlement(decision) => decision
                .user_message()
                .unwrap_or("An active subscription is required")
                .to_owned(),
            Self::RoleMismatch { role, kind } => {
                format!("{kind}s are not available to the {role} role")
            }
            Self::Quota(decision) => decision
                .denial_message()
                .unwrap_or_else(|| "Usage limit reached".to_owned()),
            Self::Content { reason } => reason.clone(),
        }
    }
}

/// Outcome of a guarded create/publish.
#[derive(Debug)]
pub enum PublishOutcome<T> {
    /// The resource was persisted and the counter committed.
    Created {
        /// Value returned by the caller's persistence action.
        value: T,
        /// Post-commit count for the current period.
        used_after: u64,
    },
    /// Denied by a business rule. Nothing was written or counted.
    Denied(DenialReason),
}

impl<T> PublishOutcome<T> {
    /// True when the resource was created.
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// The denial, if any.
    #[must_use]
    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            Self::Created { .. } => None,
            Self::Denied(reason) => Some(reason),
        }
    }
}

/// Response shape for the UI's "can I create another X" endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct LimitCheck {
    /// Kind that was checked.
    pub kind: ResourceKind,
    /// Whether a create/publish would currently be allowed.
    pub can_create: bool,
    /// Coarse gate decision.
    pub entitlement: EntitlementDecision,
    /// Fine-grained quota numbers, when the gate passed and a limit is
    /// configured for the kind.
    pub quota: Option<QuotaDecision>,
    /// User-facing message when `can_create` is false.
    pub error: Option<String>,
}

/// The entitlement service facade.
#[derive(Clone)]
pub struct EntitlementService {
    catalog: Arc<PlanCatalog>,
    gate: EntitlementGate,
    quota: QuotaEnforcer,
    safety: Arc<dyn ContentSafetyValidator>,
    payments: Option<PaymentOrders>,
}

impl std::fmt::Debug for EntitlementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementService")
            .field("payments_enabled", &self.payments.is_some())
            .finish_non_exhaustive()
    }
}

impl EntitlementService {
    /// Creates the service without purchase flows.
    ///
    /// Use [`with_payments`](Self::with_payments) to enable them when
    /// gateway credentials are configured.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        catalog: Arc<PlanCatalog>,
        safety: Arc<dyn ContentSafetyValidator>,
    ) -> Self {
        Self {
            catalog,
            gate: EntitlementGate::new(store.clone()),
            quota: QuotaEnforcer::new(store),
            safety,
            payments: None,
        }
    }

    /// Enables purchase flows with a configured gateway.
    #[must_use]
    pub fn with_payments(
        mut self,
        store: Arc<dyn EntitlementStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: &GatewayConfig,
    ) -> Self {
        self.payments =
            Some(PaymentOrders::new(store, Arc::clone(&self.catalog), gateway, config));
        self
    }

    /// True when purchase flows are available.
    ///
    /// False means the deployment has no gateway credentials; the UI
    /// should not render purchase entry points at all.
    #[must_use]
    pub fn payments_enabled(&self) -> bool {
        self.payments.is_some()
    }

    /// Answers "can this user create one more unit of `kind` right now".
    ///
    /// Read-only: consumes nothing, writes nothing (other than the gate's
    /// lazy expiry correction).
    ///
    /// # Errors
    ///
    /// Returns error on store failure, or [`EntitlementError::UnknownPlan`]
    /// when the subscription references a plan missing from the catalog.
    #[instrument(skip(self), fields(user = %user, kind = %kind))]
    pub async fn limit_check(&self, user: &UserId, kind: ResourceKind) -> Result<LimitCheck> {
        let check = self.gate.check(user).await?;
        if !check.decision.is_entitled() {
            let error = check.decision.user_message().map(ToOwned::to_owned);
            return Ok(LimitCheck {
                kind,
                can_create: false,
                entitlement: check.decision,
                quota: None,
                error,
            });
        }
        let state = check.state.as_ref().expect("entitled check always carries state");

        if !state.role.allows_kind(kind) {
            let reason = DenialReason::RoleMismatch { role: state.role, kind };
            return Ok(LimitCheck {
                kind,
                can_create: false,
                entitlement: check.decision,
                quota: None,
                error: Some(reason.user_message()),
            });
        }

        let quota = match self.plan_for(state)? {
            Some(plan) => Some(self.quota.can_consume(user, kind, plan).await?),
            // Entitled without a plan: no configured limits bind.
            None => None,
        };
        let allowed = quota.as_ref().is_none_or(|q| q.allowed);
        let error = quota.as_ref().and_then(QuotaDecision::denial_message);

        Ok(LimitCheck {
            kind,
            can_create: allowed,
            entitlement: check.decision,
            quota,
            error: if allowed { None } else { error },
        })
    }

    /// Runs the full guarded create/publish pipeline.
    ///
    /// `persist` is the caller's durable write for the new resource; it
    /// runs only after every check passed, and the usage counter is
    /// committed only after it returns `Ok`. If it fails, the error
    /// propagates and no quota is consumed.
    ///
    /// For published-content kinds, `content` passes through the safety
    /// validator first; a rejection denies without consuming quota.
    ///
    /// # Errors
    ///
    /// Returns errors from the store, the catalog, or the caller's
    /// `persist` action. Business denials are `Ok(PublishOutcome::Denied)`.
    #[instrument(skip(self, content, persist), fields(user = %user, kind = %kind))]
    pub async fn guarded_create<T, F, Fut>(
        &self,
        user: &UserId,
        kind: ResourceKind,
        content: &str,
        persist: F,
    ) -> Result<PublishOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let check = self.gate.check(user).await?;
        if !check.decision.is_entitled() {
            return Ok(PublishOutcome::Denied(DenialReason::Entitlement(check.decision)));
        }
        let state = check.state.as_ref().expect("entitled check always carries state");

        if !state.role.allows_kind(kind) {
            return Ok(PublishOutcome::Denied(DenialReason::RoleMismatch {
                role: state.role,
                kind,
            }));
        }

        if let Some(plan) = self.plan_for(state)? {
            let decision = self.quota.can_consume(user, kind, plan).await?;
            if !decision.allowed {
                return Ok(PublishOutcome::Denied(DenialReason::Quota(decision)));
            }
        }

        if kind.is_published_content() {
            let verdict = self.safety.validate(content);
            if !verdict.valid {
                let reason =
                    verdict.reason.unwrap_or_else(|| "content was rejected".to_owned());
                audit_log(
                    &AuditEvent::new(AuditEventType::ContentRejected, user.as_str())
                        .with_note(reason.clone()),
                );
                return Ok(PublishOutcome::Denied(DenialReason::Content { reason }));
            }
        }

        let value = persist().await?;
        let used_after = self.quota.commit_consumption(user, kind).await?;

        Ok(PublishOutcome::Created { value, used_after })
    }

    /// Creates a payment order.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::PaymentsDisabled`] when no gateway is
    /// configured, plus any error from the payment lifecycle.
    pub async fn create_order(&self, params: CreateOrderParams) -> Result<CheckoutInfo> {
        self.payments
            .as_ref()
            .ok_or(EntitlementError::PaymentsDisabled)?
            .create_order(params)
            .await
    }

    /// Verifies a gateway callback.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::PaymentsDisabled`] when no gateway is
    /// configured, plus any error from the payment lifecycle.
    pub async fn verify_payment(&self, params: CallbackParams) -> Result<CallbackVerification> {
        self.payments
            .as_ref()
            .ok_or(EntitlementError::PaymentsDisabled)?
            .verify_callback(params)
            .await
    }

    /// Resolves the plan referenced by a subscription, if any.
    fn plan_for<'a>(&'a self, state: &SubscriptionState) -> Result<Option<&'a Plan>> {
        match &state.plan_id {
            None => Ok(None),
            Some(plan_id) => self
                .catalog
                .plan(plan_id)
                .map(Some)
                .ok_or_else(|| EntitlementError::UnknownPlan(plan_id.to_string())),
        }
    }
}
