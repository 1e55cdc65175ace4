use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mpg_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// Client notes longer than this are truncated before they are stored.
pub const CLIENT_NOTE_MAX_LEN: usize = 500;
/// Gateway diagnostic text longer than this is truncated before it is stored.
pub const GATEWAY_RESPONSE_MAX_LEN: usize = 5_000;

//--------------------------------------       OrderId       ---------------------------------------------------------
/// Opaque order identifier, assigned by the ledger store at creation and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------      ListingId      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ListingId(pub i64);

impl Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for ListingId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------        UserId       ---------------------------------------------------------
/// A lightweight wrapper around the identity provider's opaque user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for UserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       IntentId      ---------------------------------------------------------
/// The external payment-intent id assigned by the gateway. Unique across all transactions; it is
/// the join key for every inbound webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct IntentId(pub String);

impl Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for IntentId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl IntentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been created and the client has not initiated payment yet.
    PendingPayment,
    /// A payment intent has been opened with the gateway; awaiting client action.
    PendingConfirmation,
    /// The payment was submitted and the gateway is processing it.
    PaymentProcessing,
    /// The payment succeeded and the order is confirmed.
    Confirmed,
    /// The provider is working on the order.
    InProgress,
    /// The order has been fulfilled.
    Completed,
    /// The client cancelled the order before the payment was confirmed.
    CancelledByClient,
    /// The provider cancelled the order before the payment was confirmed.
    CancelledByProvider,
    /// The last payment attempt failed. Payment may be re-initiated from this state.
    PaymentFailed,
}

impl OrderStatus {
    /// Terminal states. `PaymentFailed` is not terminal since payment can be re-initiated.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::CancelledByClient | OrderStatus::CancelledByProvider)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::PendingConfirmation => "PendingConfirmation",
            OrderStatus::PaymentProcessing => "PaymentProcessing",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::InProgress => "InProgress",
            OrderStatus::Completed => "Completed",
            OrderStatus::CancelledByClient => "CancelledByClient",
            OrderStatus::CancelledByProvider => "CancelledByProvider",
            OrderStatus::PaymentFailed => "PaymentFailed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct StatusConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "PendingConfirmation" => Ok(Self::PendingConfirmation),
            "PaymentProcessing" => Ok(Self::PaymentProcessing),
            "Confirmed" => Ok(Self::Confirmed),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "CancelledByClient" => Ok(Self::CancelledByClient),
            "CancelledByProvider" => Ok(Self::CancelledByProvider),
            "PaymentFailed" => Ok(Self::PaymentFailed),
            s => Err(StatusConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The intent has been opened with the gateway and no outcome is known yet.
    Pending,
    /// The gateway is processing the payment.
    Processing,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Open (non-terminal) transactions block a new payment attempt for the same order.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Succeeded => "Succeeded",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Succeeded" => Ok(Self::Succeeded),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(StatusConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     CancelledBy     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelledBy {
    Client,
    Provider,
}

impl CancelledBy {
    pub fn order_status(&self) -> OrderStatus {
        match self {
            CancelledBy::Client => OrderStatus::CancelledByClient,
            CancelledBy::Provider => OrderStatus::CancelledByProvider,
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// One client's locked-price request to purchase one listing.
///
/// `price_at_order` is fixed when the order is created and never changes afterwards, so listing
/// price edits cannot affect an in-flight order. Orders are never deleted; cancellation is a
/// status, not removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub listing_id: ListingId,
    pub client_id: UserId,
    pub provider_id: UserId,
    pub price_at_order: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub client_note: Option<String>,
    pub status: OrderStatus,
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
/// A fully-resolved order record, ready for insertion. Built by the lifecycle engine after the
/// creation guards have passed; the ledger store only assigns the id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub listing_id: ListingId,
    pub client_id: UserId,
    pub provider_id: UserId,
    pub price_at_order: Money,
    pub currency: String,
    pub client_note: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Locks the listing's current price and provider into the new order.
    pub fn for_listing(listing: &Listing, client_id: UserId, currency: &str) -> Self {
        Self {
            listing_id: listing.id,
            client_id,
            provider_id: listing.provider_id.clone(),
            price_at_order: listing.price,
            currency: currency.to_string(),
            client_note: None,
            scheduled_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.client_note = Some(truncate_to(note.into(), CLIENT_NOTE_MAX_LEN));
        self
    }

    pub fn with_scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }
}

//--------------------------------------  PaymentTransaction ---------------------------------------------------------
/// One attempted payment-intent lifecycle tied to an order. Created only when an intent has been
/// successfully opened with the gateway; mutated only by webhook reconciliation; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub order_id: OrderId,
    pub intent_id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway_response: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub order_id: OrderId,
    pub intent_id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub gateway_response: Option<String>,
}

impl NewPaymentTransaction {
    pub fn new(order_id: OrderId, intent_id: IntentId, amount: Money, currency: String) -> Self {
        Self { order_id, intent_id, amount, currency, gateway_response: None }
    }

    pub fn with_response<S: Into<String>>(mut self, response: S) -> Self {
        self.gateway_response = Some(truncate_to(response.into(), GATEWAY_RESPONSE_MAX_LEN));
        self
    }
}

//--------------------------------------       Listing       ---------------------------------------------------------
/// Read-side view of a catalogue listing. Listing CRUD lives outside this crate; the engine only
/// needs the price, the owning provider and the active flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub provider_id: UserId,
    pub title: String,
    pub price: Money,
    pub is_active: bool,
}

//--------------------------------------   ProviderAccount   ---------------------------------------------------------
/// Payment-readiness flags for a provider. Mutated only by gateway `account.updated` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub user_id: UserId,
    pub connected_account_id: Option<String>,
    pub onboarding_complete: bool,
    pub details_submitted: bool,
}

impl ProviderAccount {
    /// A provider can receive payments once a connected account exists and onboarding is done.
    pub fn is_payment_ready(&self) -> bool {
        self.connected_account_id.is_some() && self.onboarding_complete
    }
}

/// Truncates to at most `max_len` characters, respecting char boundaries.
pub fn truncate_to(s: String, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s
    } else {
        s.chars().take(max_len).collect()
    }
}
