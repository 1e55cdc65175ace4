//! Gateway events as seen by the lifecycle engine.
//!
//! The webhook boundary (signature verification and wire-format parsing) lives in the gateway
//! adapter; by the time an event reaches the engine it has been mapped into the closed
//! [`GatewayEvent`] enum. Adding a new event kind is a compile-time-checked exhaustive match,
//! not an open-ended string comparison.

use serde::{Deserialize, Serialize};

use crate::db_types::IntentId;

//--------------------------------------    GatewayEvent     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// The payment intent settled successfully.
    PaymentSucceeded { intent_id: IntentId },
    /// The payment intent failed. Carries the gateway's failure message, if any.
    PaymentFailed { intent_id: IntentId, failure_message: Option<String> },
    /// The payment was submitted and is being processed by the gateway.
    PaymentProcessing { intent_id: IntentId },
    /// The charge behind the intent was refunded. Recorded against the transaction only; order
    /// state is left for operator follow-up.
    PaymentRefunded { intent_id: IntentId },
    /// The provider's connected account changed; carries the fresh capability flags.
    AccountUpdated(AccountStatusUpdate),
}

impl GatewayEvent {
    pub fn intent_id(&self) -> Option<&IntentId> {
        match self {
            GatewayEvent::PaymentSucceeded { intent_id }
            | GatewayEvent::PaymentFailed { intent_id, .. }
            | GatewayEvent::PaymentProcessing { intent_id }
            | GatewayEvent::PaymentRefunded { intent_id } => Some(intent_id),
            GatewayEvent::AccountUpdated(_) => None,
        }
    }
}

//-------------------------------------- PaymentEventKind    ---------------------------------------------------------
/// The payment-affecting subset of [`GatewayEvent`], used as input to the transition tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
    Succeeded,
    Failed,
    Processing,
    Refunded,
}

//-------------------------------------- AccountStatusUpdate ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatusUpdate {
    pub connected_account_id: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

impl AccountStatusUpdate {
    /// Onboarding counts as complete once the account can charge, can be paid out, and has
    /// submitted its details.
    pub fn onboarding_complete(&self) -> bool {
        self.charges_enabled && self.payouts_enabled && self.details_submitted
    }
}
