//! Payment gateway abstraction and configuration.
//!
//! The gateway is an external collaborator: it mints an order id at
//! purchase time and later proves payment through the signed callback.
//! Configuration comes from TOML or environment variables; when no
//! credentials are present the purchase flow is disabled up front rather
//! than failing late.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Deserialize;
use url::Url;

use crate::error::{EntitlementError, Result};

/// Default request timeout for gateway calls, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway credentials and endpoint.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Public key id, exposed to the client for hosted checkout.
    pub key_id: String,
    /// Server-held secret used for callback signature verification.
    /// Never exposed to the client or written to logs.
    pub secret: String,
    /// Gateway API base URL.
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// The secret must never appear in logs or debug output.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("key_id", &self.key_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GatewayConfig {
    /// Loads configuration from `GATEWAY_KEY_ID`, `GATEWAY_SECRET`, and
    /// `GATEWAY_URL`.
    ///
    /// Returns `None` when the key id or secret is absent - the caller
    /// treats that as "payments disabled" for the whole deployment, not
    /// as a per-request error.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let key_id = std::env::var("GATEWAY_KEY_ID").ok()?;
        let secret = std::env::var("GATEWAY_SECRET").ok()?;
        let base_url = std::env::var("GATEWAY_URL").ok()?;
        Some(Self { key_id, secret, base_url, timeout_secs: DEFAULT_TIMEOUT_SECS })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the key id or secret is empty, or the base URL is
    /// not HTTPS.
    pub fn validate(&self) -> Result<()> {
        if self.key_id.is_empty() || self.secret.is_empty() {
            return Err(EntitlementError::ConfigError(
                "gateway key_id and secret cannot be empty".to_owned(),
            ));
        }
        let url = Url::parse(&self.base_url).map_err(|e| {
            EntitlementError::ConfigError(format!("invalid base_url '{}': {e}", self.base_url))
        })?;
        if url.scheme() != "https" {
            return Err(EntitlementError::ConfigError(format!(
                "base_url must use HTTPS, got: {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}

/// External payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Mints a gateway order for `amount` in `currency`.
    ///
    /// `receipt` is our order id, echoed back by the gateway for
    /// reconciliation. Returns the gateway's order id.
    async fn create_order(&self, amount: Decimal, currency: &str, receipt: &str)
        -> Result<String>;
}

/// Wire request for gateway order creation.
#[derive(Debug, serde::Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in currency minor units.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Wire response from gateway order creation.
#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: String,
}

/// Converts a decimal amount to currency minor units.
fn minor_units(amount: Decimal) -> Result<i64> {
    let scaled = amount * Decimal::from(100);
    if scaled.fract() != Decimal::ZERO {
        return Err(EntitlementError::GatewayError(format!(
            "amount {amount} has sub-minor-unit precision"
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| EntitlementError::GatewayError(format!("amount {amount} out of range")))
}

/// HTTP gateway client.
#[derive(Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Creates a client for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<String> {
        let body = CreateOrderRequest { amount: minor_units(amount)?, currency, receipt };
        let response = self
            .client
            .post(format!("{}/orders", self.config.base_url.trim_end_matches('/')))
            .basic_auth(&self.config.key_id, Some(&self.config.secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EntitlementError::GatewayError(format!(
                "gateway returned {status} for order creation"
            )));
        }

        let parsed: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| EntitlementError::GatewayError(format!("malformed response: {e}")))?;
        Ok(parsed.id)
    }
}

/// Deterministic gateway for tests and local development.
///
/// Mints sequential order ids without any network access.
#[derive(Debug, Default)]
pub struct StaticGateway {
    counter: AtomicU64,
}

impl StaticGateway {
    /// Creates a gateway starting at id 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for StaticGateway {
    async fn create_order(
        &self,
        _amount: Decimal,
        _currency: &str,
        _receipt: &str,
    ) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("gw_order_{n:06}"))
    }
}
