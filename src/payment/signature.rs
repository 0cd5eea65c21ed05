//! Gateway callback signature verification.
//!
//! The gateway proves a payment by delivering `(gateway_order_id,
//! gateway_payment_id, signature)` where the signature is HMAC-SHA256
//! over `"{gateway_order_id}|{gateway_payment_id}"` keyed with the
//! server-held secret, hex-encoded. Verification recomputes the MAC and
//! compares through [`hmac::Mac::verify_slice`], which is constant-time -
//! this is a security-sensitive equality, not a convenience check.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies gateway callback payloads.
#[derive(Clone)]
pub struct CallbackSigner {
    secret: Vec<u8>,
}

// The secret must never appear in logs or debug output.
impl std::fmt::Debug for CallbackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSigner").finish_non_exhaustive()
    }
}

impl CallbackSigner {
    /// Creates a signer from the server-held gateway secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// The canonical payload the gateway signs.
    #[must_use]
    pub fn payload(gateway_order_id: &str, gateway_payment_id: &str) -> String {
        format!("{gateway_order_id}|{gateway_payment_id}")
    }

    /// Computes the expected hex signature for an id pair.
    #[must_use]
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(Self::payload(gateway_order_id, gateway_payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies a caller-supplied hex signature against the id pair.
    ///
    /// Returns false on malformed hex as well as on a MAC mismatch; the
    /// two cases are indistinguishable to the caller on purpose.
    #[must_use]
    pub fn verify(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature_hex: &str,
    ) -> bool {
        let Ok(supplied) = hex::decode(signature_hex) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(Self::payload(gateway_order_id, gateway_payment_id).as_bytes());
        mac.verify_slice(&supplied).is_ok()
    }
}
