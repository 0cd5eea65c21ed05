//! Payment order lifecycle, gateway abstraction, and callback
//! signature verification.

mod gateway;
mod lifecycle;
mod order;
mod signature;

pub use gateway::{GatewayConfig, HttpGateway, PaymentGateway, StaticGateway};
pub use lifecycle::{
    CallbackParams, CallbackVerification, CheckoutInfo, CreateOrderParams, PaymentOrders,
};
pub use order::{
    BillingCycle, OrderId, OrderStatus, PaymentOrder, PurchaseTarget, VerifiedOutcome,
};
pub use signature::CallbackSigner;

#[cfg(test)]
#[path = "tests/proptest_signatures.rs"]
mod proptest_signatures;
