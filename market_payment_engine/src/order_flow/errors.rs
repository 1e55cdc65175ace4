use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatus},
    traits::{GatewayError, LedgerError},
};

//--------------------------------------     Precondition    ---------------------------------------------------------
/// Business-rule guards that fail an operation before any write happens. The messages are safe
/// to show to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("The listing is not available")]
    ListingUnavailable,
    #[error("You cannot order your own listing")]
    SelfPurchase,
    #[error("The service provider is not yet fully set up to receive payments")]
    ProviderNotPaymentReady,
}

//--------------------------------------    OrderFlowError   ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Precondition failed. {0}")]
    PreconditionFailed(Precondition),
    #[error("A payment for this order is already in flight")]
    PaymentAlreadyInFlight,
    #[error("Payment gateway error. {0}")]
    Gateway(#[from] GatewayError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The order status may not change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Cannot mark the order as complete if payment is not confirmed")]
    PaymentNotConfirmed,
    /// Transient persistence failure. Not retried here; the caller (or the gateway's webhook
    /// redelivery) decides whether to try again.
    #[error("The ledger store is temporarily unavailable. {0}")]
    StorageUnavailable(String),
}

impl From<LedgerError> for OrderFlowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            other => OrderFlowError::StorageUnavailable(other.to_string()),
        }
    }
}
