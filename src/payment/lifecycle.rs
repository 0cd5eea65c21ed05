//! Payment order lifecycle.
//!
//! Orders move `created -> verified` on a signature-checked gateway
//! callback, or `created -> failed` on a rejected one. The verified
//! transition happens exactly once per order; re-delivered callbacks for
//! an already-verified order return the stored outcome without
//! re-applying subscription or role side effects.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{
    gateway::{GatewayConfig, PaymentGateway},
    order::{OrderId, OrderStatus, PaymentOrder, PurchaseTarget, VerifiedOutcome},
    signature::CallbackSigner,
};
use crate::{
    audit::{AuditEvent, AuditEventType, audit_log},
    catalog::PlanCatalog,
    error::{EntitlementError, Result},
    payment::BillingCycle,
    roles::RoleUnlocks,
    store::{EntitlementStore, UserId},
    subscription::SubscriptionState,
};

/// Parameters for creating an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderParams {
    /// Buyer (server-side resolved identity).
    pub user_id: UserId,
    /// What is being purchased.
    pub target: PurchaseTarget,
}

/// Everything the client needs to open the gateway's hosted checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutInfo {
    /// Our order id; pass it back with the callback.
    pub order_id: OrderId,
    /// Gateway-minted order id.
    pub gateway_order_id: String,
    /// Charge amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Public gateway key id.
    pub key_id: String,
}

/// Parameters delivered by the gateway callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    /// Our order id.
    pub order_id: OrderId,
    /// Gateway order id, as signed.
    pub gateway_order_id: String,
    /// Gateway payment id, as signed.
    pub gateway_payment_id: String,
    /// Hex HMAC over `"{gateway_order_id}|{gateway_payment_id}"`.
    pub signature: String,
}

/// Successful verification result.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackVerification {
    /// Side effects of the verified transition.
    pub outcome: VerifiedOutcome,
    /// True when this delivery was a duplicate of an earlier success.
    pub already_processed: bool,
}

/// Payment order service.
#[derive(Clone)]
pub struct PaymentOrders {
    store: Arc<dyn EntitlementStore>,
    catalog: Arc<PlanCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    signer: CallbackSigner,
    key_id: String,
    unlocks: RoleUnlocks,
}

impl std::fmt::Debug for PaymentOrders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentOrders").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

impl PaymentOrders {
    /// Creates the service.
    ///
    /// The configuration must already be validated; its secret feeds the
    /// callback signer and its key id is surfaced to clients for hosted
    /// checkout.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        catalog: Arc<PlanCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            store: store.clone(),
            catalog,
            gateway,
            signer: CallbackSigner::new(config.secret.as_bytes()),
            key_id: config.key_id.clone(),
            unlocks: RoleUnlocks::new(store),
        }
    }

    /// Creates a payment order and mints the gateway order.
    ///
    /// No local state is written until the gateway call succeeds, so a
    /// gateway failure leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::UnknownPlan`] /
    /// [`EntitlementError::UnknownCourse`] for missing targets,
    /// [`EntitlementError::InvalidPurchaseTarget`] for free plans or a
    /// plan scoped to a different role than the buyer's, and gateway or
    /// store errors otherwise.
    #[instrument(skip(self, params), fields(user = %params.user_id))]
    pub async fn create_order(&self, params: CreateOrderParams) -> Result<CheckoutInfo> {
        let (amount, currency) = self.resolve_target(&params.user_id, &params.target).await?;

        let order_id = OrderId::generate();
        let gateway_order_id =
            self.gateway.create_order(amount, &currency, order_id.as_str()).await?;

        let order = PaymentOrder {
            id: order_id.clone(),
            user_id: params.user_id.clone(),
            target: params.target,
            amount,
            currency: currency.clone(),
            gateway_order_id: gateway_order_id.clone(),
            status: OrderStatus::Created,
            outcome: None,
            created_at: Utc::now(),
        };
        self.store.insert_order(&order).await?;

        audit_log(
            &AuditEvent::new(AuditEventType::OrderCreated, params.user_id.as_str())
                .with_order_id(order_id.as_str())
                .with_gateway_order_id(&gateway_order_id),
        );
        info!(order = %order_id, gateway_order = %gateway_order_id, "payment order created");

        Ok(CheckoutInfo {
            order_id,
            gateway_order_id,
            amount,
            currency,
            key_id: self.key_id.clone(),
        })
    }

    /// Verifies a gateway callback and applies side effects exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::VerificationFailed`] on a signature or
    /// id mismatch (the order transitions to `failed`),
    /// [`EntitlementError::OrderNotFound`] for unknown orders, and
    /// [`EntitlementError::OrderAlreadyTerminal`] for `failed` or
    /// `cancelled` orders. Re-delivery for a `verified` order is a
    /// success with `already_processed = true`.
    #[instrument(skip(self, params), fields(order = %params.order_id))]
    pub async fn verify_callback(&self, params: CallbackParams) -> Result<CallbackVerification> {
        let order = self
            .store
            .order(&params.order_id)
            .await?
            .ok_or_else(|| EntitlementError::OrderNotFound(params.order_id.to_string()))?;

        match order.status {
            OrderStatus::Verified => {
                audit_log(
                    &AuditEvent::new(AuditEventType::CallbackReplayed, order.user_id.as_str())
                        .with_order_id(order.id.as_str()),
                );
                Ok(CallbackVerification {
                    outcome: order.outcome.unwrap_or_default(),
                    already_processed: true,
                })
            }
            OrderStatus::Failed | OrderStatus::Cancelled => {
                Err(EntitlementError::OrderAlreadyTerminal(format!(
                    "{} is {}",
                    order.id, order.status
                )))
            }
            OrderStatus::Created => self.verify_created(order, &params).await,
        }
    }

    /// Verification path for an order still in `created`.
    async fn verify_created(
        &self,
        order: PaymentOrder,
        params: &CallbackParams,
    ) -> Result<CallbackVerification> {
        let authentic = params.gateway_order_id == order.gateway_order_id
            && self.signer.verify(
                &params.gateway_order_id,
                &params.gateway_payment_id,
                &params.signature,
            );

        if !authentic {
            self.store
                .transition_order(&order.id, OrderStatus::Created, OrderStatus::Failed)
                .await?;
            audit_log(
                &AuditEvent::new(AuditEventType::SignatureMismatch, order.user_id.as_str())
                    .with_order_id(order.id.as_str())
                    .with_gateway_order_id(&order.gateway_order_id)
                    .with_supplied_signature(&params.signature),
            );
            warn!(order = %order.id, "callback signature mismatch");
            return Err(EntitlementError::VerificationFailed);
        }

        // Claim the single created -> verified transition. Losing the
        // race means a concurrent delivery already settled this order.
        let claimed = self
            .store
            .transition_order(&order.id, OrderStatus::Created, OrderStatus::Verified)
            .await?;
        if !claimed {
            let current = self
                .store
                .order(&order.id)
                .await?
                .ok_or_else(|| EntitlementError::OrderNotFound(order.id.to_string()))?;
            return match current.status {
                OrderStatus::Verified => Ok(CallbackVerification {
                    outcome: current.outcome.unwrap_or_default(),
                    already_processed: true,
                }),
                status => Err(EntitlementError::OrderAlreadyTerminal(format!(
                    "{} is {status}",
                    order.id
                ))),
            };
        }

        let outcome = self.settle(&order).await?;
        self.store.record_order_outcome(&order.id, &outcome).await?;

        audit_log(
            &AuditEvent::new(AuditEventType::CallbackVerified, order.user_id.as_str())
                .with_order_id(order.id.as_str())
                .with_gateway_order_id(&order.gateway_order_id),
        );
        info!(order = %order.id, "payment verified");

        Ok(CallbackVerification { outcome, already_processed: false })
    }

    /// Applies the side effects of a verified order.
    async fn settle(&self, order: &PaymentOrder) -> Result<VerifiedOutcome> {
        match &order.target {
            PurchaseTarget::Subscription { plan_id, billing_cycle } => {
                let plan = self
                    .catalog
                    .plan(plan_id)
                    .ok_or_else(|| EntitlementError::UnknownPlan(plan_id.to_string()))?;
                let mut state = self
                    .store
                    .subscription(&order.user_id)
                    .await?
                    .unwrap_or_else(|| SubscriptionState::free_tier(plan.role));
                state.apply_settlement(plan, billing_cycle.months(), Utc::now());
                self.store.save_subscription(&order.user_id, &state).await?;
                info!(
                    user = %order.user_id,
                    plan = %plan.id,
                    expires = ?state.expires_at,
                    "subscription settled"
                );
                Ok(VerifiedOutcome::default())
            }
            PurchaseTarget::Course { course_id } => {
                let course = self
                    .catalog
                    .course(course_id)
                    .ok_or_else(|| EntitlementError::UnknownCourse(course_id.to_string()))?;
                let Some(role) = course.grants_role else {
                    return Ok(VerifiedOutcome::default());
                };
                let result = self.unlocks.unlock(&order.user_id, role, course_id).await?;
                if !result.already_unlocked {
                    audit_log(
                        &AuditEvent::new(AuditEventType::RoleUnlocked, order.user_id.as_str())
                            .with_order_id(order.id.as_str())
                            .with_note(format!("role {role} via course {course_id}")),
                    );
                }
                Ok(VerifiedOutcome {
                    role_unlocked: (!result.already_unlocked).then_some(role),
                    redirect_role: Some(result.redirect_role),
                })
            }
        }
    }

    /// Resolves the charge for a purchase target.
    async fn resolve_target(
        &self,
        user: &UserId,
        target: &PurchaseTarget,
    ) -> Result<(Decimal, String)> {
        match target {
            PurchaseTarget::Subscription { plan_id, billing_cycle } => {
                let plan = self
                    .catalog
                    .plan(plan_id)
                    .ok_or_else(|| EntitlementError::UnknownPlan(plan_id.to_string()))?;
                if plan.is_free() {
                    return Err(EntitlementError::InvalidPurchaseTarget(format!(
                        "plan {plan_id} is free and requires no payment"
                    )));
                }
                // A buyer with an established paid role may only target
                // plans for that role.
                if let Some(sub) = self.store.subscription(user).await?
                    && sub.plan_id.is_some()
                    && sub.role != plan.role
                {
                    return Err(EntitlementError::InvalidPurchaseTarget(format!(
                        "plan {plan_id} is for role {}, caller is {}",
                        plan.role, sub.role
                    )));
                }
                let amount = match billing_cycle {
                    BillingCycle::Monthly => plan.price,
                    BillingCycle::Yearly => plan.yearly_amount(),
                };
                Ok((amount, plan.currency.clone()))
            }
            PurchaseTarget::Course { course_id } => {
                let course = self
                    .catalog
                    .course(course_id)
                    .ok_or_else(|| EntitlementError::UnknownCourse(course_id.to_string()))?;
                Ok((course.price, course.currency.clone()))
            }
        }
    }

    /// Grants access to the signer for callback simulation in tests.
    #[cfg(test)]
    pub(crate) fn signer(&self) -> &CallbackSigner {
        &self.signer
    }
}
