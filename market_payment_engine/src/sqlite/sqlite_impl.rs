//! `SqliteLedger` is the production implementation of the [`LedgerStore`] contract.
//!
//! Every method that touches an (order, transaction) pair runs both writes inside a single
//! SQLite transaction; a crash can never leave one record updated and the other not.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{catalog, new_pool, orders, transactions};
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
        PaymentTransaction,
        ProviderAccount,
    },
    traits::{CheckoutContext, LedgerError, LedgerStore, OrderContext, PaymentUpdate},
};

#[derive(Clone)]
pub struct SqliteLedger {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteLedger ({})", self.url)
    }
}

impl SqliteLedger {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("migration failure: {e}")))?;
        info!("🗃️ Ledger migrations complete");
        Ok(())
    }
}

impl LedgerStore for SqliteLedger {
    async fn fetch_checkout_context(&self, listing_id: ListingId) -> Result<Option<CheckoutContext>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let listing = match catalog::fetch_listing(listing_id, &mut conn).await? {
            Some(l) => l,
            None => return Ok(None),
        };
        let provider = catalog::fetch_provider(&listing.provider_id, &mut conn).await?;
        Ok(Some(CheckoutContext { listing, provider }))
    }

    async fn upsert_listing(&self, listing: Listing) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        catalog::upsert_listing(listing, &mut conn).await
    }

    async fn upsert_provider(&self, provider: ProviderAccount) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        catalog::upsert_provider(provider, &mut conn).await
    }

    async fn update_provider_payment_readiness(
        &self,
        connected_account_id: &str,
        onboarding_complete: bool,
        details_submitted: bool,
    ) -> Result<Option<ProviderAccount>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_provider_readiness(connected_account_id, onboarding_complete, details_submitted, &mut conn)
            .await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the ledger", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_context(&self, id: OrderId) -> Result<Option<OrderContext>, LedgerError> {
        // Read everything in one transaction so the context is a consistent snapshot.
        let mut tx = self.pool.begin().await?;
        let order = match orders::fetch_order(id, &mut tx).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let listing = catalog::fetch_listing(order.listing_id, &mut tx)
            .await?
            .ok_or(LedgerError::ListingNotFound(order.listing_id))?;
        let provider = catalog::fetch_provider(&order.provider_id, &mut tx).await?;
        let transactions = transactions::fetch_for_order(id, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(OrderContext { order, listing, provider, transactions }))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(id, status, &mut conn).await?.ok_or(LedgerError::OrderNotFound(id))
    }

    async fn fetch_transaction_by_intent_id(
        &self,
        intent_id: &IntentId,
    ) -> Result<Option<PaymentTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_by_intent_id(intent_id, &mut conn).await
    }

    async fn insert_transaction_with_order_status(
        &self,
        transaction: NewPaymentTransaction,
        order_status: OrderStatus,
    ) -> Result<PaymentTransaction, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if transactions::fetch_by_intent_id(&transaction.intent_id, &mut tx).await?.is_some() {
            return Err(LedgerError::DuplicateIntentId(transaction.intent_id));
        }
        let order_id = transaction.order_id;
        let record = transactions::insert_transaction(transaction, &mut tx).await?;
        orders::update_order_status(order_id, order_status, &mut tx)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ Transaction [{}] recorded for order {order_id}", record.intent_id);
        Ok(record)
    }

    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<(PaymentTransaction, Order), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let record =
            transactions::update_status(&update.intent_id, update.transaction_status, update.gateway_response, &mut tx)
                .await?
                .ok_or_else(|| LedgerError::TransactionNotFound(update.intent_id.clone()))?;
        let order = match update.order_status {
            Some(status) => orders::update_order_status(record.order_id, status, &mut tx)
                .await?
                .ok_or(LedgerError::OrderNotFound(record.order_id))?,
            None => orders::fetch_order(record.order_id, &mut tx)
                .await?
                .ok_or(LedgerError::OrderNotFound(record.order_id))?,
        };
        tx.commit().await?;
        debug!("🗃️ Payment update applied for intent [{}]; order {} is {}", record.intent_id, order.id, order.status);
        Ok((record, order))
    }
}
