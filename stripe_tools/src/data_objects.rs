//! Wire-format types for the subset of the Stripe API this system touches.

use serde::Deserialize;
use serde_json::Value;

//-------------------------------------- PaymentIntentResource -------------------------------------------------------
/// The REST response for a created payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentResource {
    pub id: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

//--------------------------------------    ErrorResponse     --------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

//--------------------------------------     StripeEvent      --------------------------------------------------------
/// A verified webhook event envelope. `data.object` stays untyped until a caller asks for one of
/// the typed views below; unknown event kinds simply never get asked.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl StripeEvent {
    pub fn payment_intent(&self) -> Option<PaymentIntentObject> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    pub fn account(&self) -> Option<AccountObject> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    pub fn charge(&self) -> Option<ChargeObject> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

//--------------------------------------  PaymentIntentObject --------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastPaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

//--------------------------------------    AccountObject     --------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct AccountObject {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
}

//--------------------------------------     ChargeObject     --------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
}
