//! Audit logging for security-relevant events.
//!
//! Structured audit entries are emitted through `tracing` under the
//! `"audit"` target so deployments can route them to a separate sink.
//! Signature material is redacted before logging: enough prefix survives
//! to correlate an investigation, and the expected signature is never
//! logged at all.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// A payment order was created.
    OrderCreated,
    /// A gateway callback verified successfully.
    CallbackVerified,
    /// A callback for an already-verified order was re-delivered.
    CallbackReplayed,
    /// A callback signature did not match - possible tampering.
    SignatureMismatch,
    /// A role was unlocked by a verified course purchase.
    RoleUnlocked,
    /// A publish was rejected by the content safety validator.
    ContentRejected,
}

/// Contextual details for an audit entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Our order id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Gateway order id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
    /// Redacted prefix of the supplied signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_prefix: Option<String>,
    /// Free-form context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A single audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// What happened.
    pub event_type: AuditEventType,
    /// Who it happened to (resolved user id).
    pub user_id: String,
    /// Correlation id for tracking across operations.
    pub request_id: Uuid,
    /// Contextual details.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates a new audit event.
    #[must_use]
    pub fn new(event_type: AuditEventType, user_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            event_type,
            user_id: user_id.into(),
            request_id: Uuid::new_v4(),
            details: AuditDetails::default(),
        }
    }

    /// Adds our order id.
    #[must_use]
    pub fn with_order_id(mut self, id: impl Into<String>) -> Self {
        self.details.order_id = Some(id.into());
        self
    }

    /// Adds the gateway order id.
    #[must_use]
    pub fn with_gateway_order_id(mut self, id: impl Into<String>) -> Self {
        self.details.gateway_order_id = Some(id.into());
        self
    }

    /// Adds the supplied signature, redacted to a short prefix.
    #[must_use]
    pub fn with_supplied_signature(mut self, signature: &str) -> Self {
        self.details.signature_prefix = Some(redact_signature(signature));
        self
    }

    /// Adds a free-form note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.details.note = Some(note.into());
        self
    }
}

/// Logs an audit event under the `"audit"` tracing target.
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = ?event.timestamp,
        event_type = ?event.event_type,
        user_id = %event.user_id,
        request_id = %event.request_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Redacts a signature to its first eight characters.
///
/// Enough to correlate repeated tampering attempts without preserving
/// usable signature material in logs.
#[must_use]
pub fn redact_signature(signature: &str) -> String {
    let prefix: String = signature.chars().take(8).collect();
    if signature.chars().count() > 8 {
        format!("{prefix}…")
    } else {
        prefix
    }
}
