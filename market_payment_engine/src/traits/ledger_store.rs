use thiserror::Error;

use crate::db_types::{
    IntentId,
    Listing,
    ListingId,
    NewOrder,
    NewPaymentTransaction,
    Order,
    OrderId,
    OrderStatus,
    PaymentStatus,
    PaymentTransaction,
    ProviderAccount,
};

//--------------------------------------   CheckoutContext   ---------------------------------------------------------
/// Everything order creation needs, fetched eagerly in one call: the listing and the owning
/// provider's payment-readiness record (which may not exist yet).
#[derive(Debug, Clone)]
pub struct CheckoutContext {
    pub listing: Listing,
    pub provider: Option<ProviderAccount>,
}

//--------------------------------------     OrderContext    ---------------------------------------------------------
/// Everything payment initiation and manual status changes need, fetched eagerly in one call.
/// The engine never relies on fetch-on-access for related records.
#[derive(Debug, Clone)]
pub struct OrderContext {
    pub order: Order,
    pub listing: Listing,
    pub provider: Option<ProviderAccount>,
    pub transactions: Vec<PaymentTransaction>,
}

impl OrderContext {
    /// The order's open (non-terminal) transaction, if any. The engine guarantees there is at
    /// most one.
    pub fn open_transaction(&self) -> Option<&PaymentTransaction> {
        self.transactions.iter().find(|t| t.status.is_open())
    }
}

//--------------------------------------    PaymentUpdate    ---------------------------------------------------------
/// One reconciliation write: the transaction's new state plus the order transition that goes with
/// it, applied by the store as a single atomic unit.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub intent_id: IntentId,
    pub transaction_status: PaymentStatus,
    pub gateway_response: Option<String>,
    /// `None` leaves the order untouched (e.g. a replayed or out-of-order event).
    pub order_status: Option<OrderStatus>,
}

//--------------------------------------     LedgerError     ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transient persistence failure. The engine does not retry; callers decide whether the
    /// upstream delivery mechanism should.
    #[error("The ledger store is unavailable. {0}")]
    Unavailable(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested listing {0} does not exist")]
    ListingNotFound(ListingId),
    #[error("A transaction already exists for intent id {0}")]
    DuplicateIntentId(IntentId),
    #[error("No transaction exists for intent id {0}")]
    TransactionNotFound(IntentId),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Unavailable(e.to_string())
    }
}

//--------------------------------------     LedgerStore     ---------------------------------------------------------
/// Durable persistence for orders and payment transactions.
///
/// Contract requirements:
/// * Methods that touch an (order, transaction) pair commit both records as one atomic unit;
///   a crash can never leave one updated and the other not.
/// * Orders and transactions are never physically deleted.
/// * `intent_id` is unique across all transactions.
///
/// Serialization of concurrent writers for the *same* order is the engine's job (per-order
/// locks), not the store's; the store only guarantees atomicity of each individual call.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: Clone + Send + Sync {
    //----- Catalogue boundary (read-side, plus seeding and the account-event mutation) -----

    async fn fetch_checkout_context(&self, listing_id: ListingId) -> Result<Option<CheckoutContext>, LedgerError>;

    async fn upsert_listing(&self, listing: Listing) -> Result<(), LedgerError>;

    async fn upsert_provider(&self, provider: ProviderAccount) -> Result<(), LedgerError>;

    /// Applies fresh capability flags from an `account.updated` event. Returns the updated
    /// provider record, or `None` when no provider has the given connected account id.
    async fn update_provider_payment_readiness(
        &self,
        connected_account_id: &str,
        onboarding_complete: bool,
        details_submitted: bool,
    ) -> Result<Option<ProviderAccount>, LedgerError>;

    //----- Orders -----

    /// Stores a new order in `PendingPayment` status and assigns its id.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, LedgerError>;

    /// Fetches the order together with its listing, provider record and all transactions.
    async fn fetch_order_context(&self, id: OrderId) -> Result<Option<OrderContext>, LedgerError>;

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, LedgerError>;

    //----- Transactions -----

    async fn fetch_transaction_by_intent_id(
        &self,
        intent_id: &IntentId,
    ) -> Result<Option<PaymentTransaction>, LedgerError>;

    /// Inserts a new `Pending` transaction and moves its order to `order_status`, atomically.
    async fn insert_transaction_with_order_status(
        &self,
        transaction: NewPaymentTransaction,
        order_status: OrderStatus,
    ) -> Result<PaymentTransaction, LedgerError>;

    /// Applies a reconciliation write: transaction status, diagnostic text and timestamp, plus
    /// the optional order transition, atomically. Returns both records as persisted.
    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<(PaymentTransaction, Order), LedgerError>;
}
