use mpg_common::Money;
use thiserror::Error;

use crate::db_types::{IntentId, OrderId};

//--------------------------------------   NewPaymentIntent  ---------------------------------------------------------
/// A request to open one payment intent with the gateway. Amounts stay in decimal currency units
/// here; the adapter converts to integer minor units at the wire boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentIntent {
    pub amount: Money,
    pub currency: String,
    pub order_id: OrderId,
    pub description: String,
    /// The provider's connected account; the gateway transfers the settled funds there.
    pub destination_account: String,
    /// The marketplace's cut, declared to the gateway and deducted by it at settlement.
    pub platform_fee: Money,
}

//--------------------------------------    PaymentIntent    ---------------------------------------------------------
/// The gateway's handle for an opened intent. The client secret is handed to the end user's
/// payment form; the intent id is the reconciliation key for every subsequent webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub intent_id: IntentId,
    pub client_secret: String,
}

//--------------------------------------     GatewayError    ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway processed the request and said no. The message is safe to surface to users.
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    /// The request timed out. An intent may still have been created gateway-side; a later
    /// webhook resolves the ambiguity.
    #[error("The payment gateway did not respond in time")]
    Timeout,
    #[error("Could not reach the payment gateway. {0}")]
    Transport(String),
}

//--------------------------------------    PaymentGateway   ---------------------------------------------------------
/// Outbound contract to the external payment gateway. Implementations make exactly one network
/// call per invocation, keep no local state, and must bound the request with a timeout.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone + Send + Sync {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError>;
}
