//! In-memory reference implementation of the [`LedgerStore`] contract.
//!
//! Every call takes the single store lock, which makes each call trivially atomic. This is the
//! backend used by the engine's integration tests and the reference for what each contract
//! method must do; production deployments use the SQLite backend.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    db_types::{
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
    },
    traits::{CheckoutContext, LedgerError, LedgerStore, OrderContext, PaymentUpdate},
};

#[derive(Default)]
struct Inner {
    listings: HashMap<ListingId, Listing>,
    providers: HashMap<String, ProviderAccount>,
    orders: HashMap<OrderId, Order>,
    transactions: Vec<PaymentTransaction>,
    next_order_id: i64,
    next_transaction_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedger {
    async fn fetch_checkout_context(&self, listing_id: ListingId) -> Result<Option<CheckoutContext>, LedgerError> {
        let inner = self.inner.lock().await;
        let listing = match inner.listings.get(&listing_id) {
            Some(l) => l.clone(),
            None => return Ok(None),
        };
        let provider = inner.providers.get(listing.provider_id.as_str()).cloned();
        Ok(Some(CheckoutContext { listing, provider }))
    }

    async fn upsert_listing(&self, listing: Listing) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().await;
        inner.listings.insert(listing.id, listing);
        Ok(())
    }

    async fn upsert_provider(&self, provider: ProviderAccount) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().await;
        inner.providers.insert(provider.user_id.0.clone(), provider);
        Ok(())
    }

    async fn update_provider_payment_readiness(
        &self,
        connected_account_id: &str,
        onboarding_complete: bool,
        details_submitted: bool,
    ) -> Result<Option<ProviderAccount>, LedgerError> {
        let mut inner = self.inner.lock().await;
        let provider = inner
            .providers
            .values_mut()
            .find(|p| p.connected_account_id.as_deref() == Some(connected_account_id));
        match provider {
            Some(p) => {
                p.onboarding_complete = onboarding_complete;
                p.details_submitted = details_submitted;
                Ok(Some(p.clone()))
            },
            None => Ok(None),
        }
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut inner = self.inner.lock().await;
        inner.next_order_id += 1;
        let order = Order {
            id: OrderId(inner.next_order_id),
            listing_id: order.listing_id,
            client_id: order.client_id,
            provider_id: order.provider_id,
            price_at_order: order.price_at_order,
            currency: order.currency,
            created_at: order.created_at,
            scheduled_at: order.scheduled_at,
            client_note: order.client_note,
            status: OrderStatus::PendingPayment,
        };
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, LedgerError> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.get(&id).cloned())
    }

    async fn fetch_order_context(&self, id: OrderId) -> Result<Option<OrderContext>, LedgerError> {
        let inner = self.inner.lock().await;
        let order = match inner.orders.get(&id) {
            Some(o) => o.clone(),
            None => return Ok(None),
        };
        let listing =
            inner.listings.get(&order.listing_id).cloned().ok_or(LedgerError::ListingNotFound(order.listing_id))?;
        let provider = inner.providers.get(order.provider_id.as_str()).cloned();
        let transactions = inner.transactions.iter().filter(|t| t.order_id == id).cloned().collect();
        Ok(Some(OrderContext { order, listing, provider, transactions }))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, LedgerError> {
        let mut inner = self.inner.lock().await;
        let order = inner.orders.get_mut(&id).ok_or(LedgerError::OrderNotFound(id))?;
        order.status = status;
        Ok(order.clone())
    }

    async fn fetch_transaction_by_intent_id(
        &self,
        intent_id: &IntentId,
    ) -> Result<Option<PaymentTransaction>, LedgerError> {
        let inner = self.inner.lock().await;
        Ok(inner.transactions.iter().find(|t| t.intent_id == *intent_id).cloned())
    }

    async fn insert_transaction_with_order_status(
        &self,
        transaction: NewPaymentTransaction,
        order_status: OrderStatus,
    ) -> Result<PaymentTransaction, LedgerError> {
        let mut inner = self.inner.lock().await;
        if inner.transactions.iter().any(|t| t.intent_id == transaction.intent_id) {
            return Err(LedgerError::DuplicateIntentId(transaction.intent_id));
        }
        let order = inner.orders.get_mut(&transaction.order_id).ok_or(LedgerError::OrderNotFound(transaction.order_id))?;
        order.status = order_status;
        inner.next_transaction_id += 1;
        let transaction = PaymentTransaction {
            id: inner.next_transaction_id,
            order_id: transaction.order_id,
            intent_id: transaction.intent_id,
            amount: transaction.amount,
            currency: transaction.currency,
            status: PaymentStatus::Pending,
            gateway_response: transaction.gateway_response,
            updated_at: Utc::now(),
        };
        inner.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<(PaymentTransaction, Order), LedgerError> {
        let mut inner = self.inner.lock().await;
        let transaction = inner
            .transactions
            .iter_mut()
            .find(|t| t.intent_id == update.intent_id)
            .ok_or(LedgerError::TransactionNotFound(update.intent_id.clone()))?;
        transaction.status = update.transaction_status;
        if let Some(response) = update.gateway_response {
            transaction.gateway_response = Some(response);
        }
        transaction.updated_at = Utc::now();
        let transaction = transaction.clone();
        let order = inner.orders.get_mut(&transaction.order_id).ok_or(LedgerError::OrderNotFound(transaction.order_id))?;
        if let Some(status) = update.order_status {
            order.status = status;
        }
        Ok((transaction, order.clone()))
    }
}
