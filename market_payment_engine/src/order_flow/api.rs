use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        truncate_to,
        CancelledBy,
        IntentId,
        ListingId,
        NewOrder,
        NewPaymentTransaction,
        Order,
        OrderId,
        OrderStatus,
        PaymentStatus,
        UserId,
        GATEWAY_RESPONSE_MAX_LEN,
    },
    events::{GatewayEvent, PaymentEventKind},
    fees::FeeSchedule,
    order_flow::{
        errors::{OrderFlowError, Precondition},
        locks::OrderLocks,
        transitions,
        transitions::ManualTransition,
    },
    traits::{LedgerStore, NewPaymentIntent, OrderContext, PaymentGateway, PaymentIntent, PaymentUpdate},
};

//--------------------------------------   CheckoutRequest   ---------------------------------------------------------
/// The client-supplied part of a new order. Everything else (price, provider, timestamps) is
/// resolved by the engine from the listing at creation time.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub listing_id: ListingId,
    pub client_note: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

//--------------------------------------  ReconcileOutcome   ---------------------------------------------------------
/// What reconciling one webhook event did. All variants are successful outcomes from the
/// gateway's point of view: once one is returned, the event has been durably applied (or durably
/// recognised as not applicable) and the gateway must stop retrying.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReconcileOutcome {
    /// The transaction (and possibly its order) moved to a new state.
    Applied { order_id: OrderId, order_status: OrderStatus, transaction_status: PaymentStatus },
    /// A replay of an event that has already been applied; nothing was written.
    AlreadyApplied { order_id: OrderId },
    /// No transaction matches the event's intent id. Logged and ignored; a webhook never
    /// fabricates a transaction.
    Unmatched { intent_id: IntentId },
    /// Provider payment-readiness flags were refreshed from an account event.
    ProviderUpdated { user_id: UserId, payment_ready: bool },
    /// An account event for a connected account this system does not track.
    UnknownAccount { connected_account_id: String },
}

//--------------------------------------    OrderFlowApi     ---------------------------------------------------------
/// The order/payment lifecycle engine.
///
/// Two independent writers drive it: the user-initiated checkout flow and the gateway's
/// asynchronous webhook stream. All mutations for one order are serialised through a per-order
/// lock; operations on different orders proceed in parallel. Webhook reconciliation is
/// idempotent, so at-least-once, unordered delivery converges on the correct state.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    fees: FeeSchedule,
    currency: String,
    locks: OrderLocks,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G, fees: FeeSchedule, currency: impl Into<String>) -> Self {
        Self { db, gateway, fees, currency: currency.into(), locks: OrderLocks::new() }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    /// Creates a new order in `PendingPayment` status at the listing's current price.
    ///
    /// Guards, checked before any write:
    /// * the listing exists and is active,
    /// * the client is not the listing's own provider,
    /// * the provider is ready to receive payments.
    ///
    /// A guard violation returns [`OrderFlowError::PreconditionFailed`] and writes nothing.
    pub async fn create_order(&self, client_id: UserId, request: CheckoutRequest) -> Result<Order, OrderFlowError> {
        let ctx = self
            .db
            .fetch_checkout_context(request.listing_id)
            .await?
            .ok_or(OrderFlowError::PreconditionFailed(Precondition::ListingUnavailable))?;
        if !ctx.listing.is_active {
            return Err(OrderFlowError::PreconditionFailed(Precondition::ListingUnavailable));
        }
        if ctx.listing.provider_id == client_id {
            return Err(OrderFlowError::PreconditionFailed(Precondition::SelfPurchase));
        }
        match &ctx.provider {
            Some(p) if p.is_payment_ready() => {},
            _ => return Err(OrderFlowError::PreconditionFailed(Precondition::ProviderNotPaymentReady)),
        }
        let mut order = NewOrder::for_listing(&ctx.listing, client_id, &self.currency);
        if let Some(note) = request.client_note {
            order = order.with_note(note);
        }
        if let Some(at) = request.scheduled_at {
            order = order.with_scheduled_at(at);
        }
        let order = self.db.insert_order(order).await?;
        info!(
            "🔄️📦️ Order {} created for listing {} at {} {}",
            order.id, order.listing_id, order.price_at_order, order.currency
        );
        Ok(order)
    }

    /// Opens a payment intent for the order and records the new transaction.
    ///
    /// Only valid from `PendingPayment` or `PaymentFailed`. Provider readiness is re-checked
    /// here because it can change between order creation and payment. If the order already has
    /// an open transaction, the call fails with [`OrderFlowError::PaymentAlreadyInFlight`]; the
    /// engine never allows two concurrent open intents for one order.
    ///
    /// On gateway success, the `Pending` transaction and the `PendingConfirmation` order status
    /// are persisted as one atomic unit. On gateway failure (including timeout) the order is
    /// marked `PaymentFailed`, no transaction is created, and the gateway's message is returned.
    pub async fn initiate_payment(
        &self,
        order_id: OrderId,
        requested_by: &UserId,
    ) -> Result<PaymentIntent, OrderFlowError> {
        let _guard = self.locks.acquire(order_id).await;
        let ctx = self.db.fetch_order_context(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if ctx.order.client_id != *requested_by {
            // Foreign orders are indistinguishable from missing ones.
            return Err(OrderFlowError::OrderNotFound(order_id));
        }
        if let Some(open) = ctx.open_transaction() {
            warn!("🔄️💳️ Order {order_id} already has intent [{}] in flight; rejecting re-initiation", open.intent_id);
            return Err(OrderFlowError::PaymentAlreadyInFlight);
        }
        match ctx.order.status {
            OrderStatus::PendingPayment | OrderStatus::PaymentFailed => {},
            from => return Err(OrderFlowError::InvalidTransition { from, to: OrderStatus::PendingConfirmation }),
        }
        let destination = match &ctx.provider {
            Some(p) if p.is_payment_ready() => match &p.connected_account_id {
                Some(account) => account.clone(),
                None => return Err(OrderFlowError::PreconditionFailed(Precondition::ProviderNotPaymentReady)),
            },
            _ => return Err(OrderFlowError::PreconditionFailed(Precondition::ProviderNotPaymentReady)),
        };
        let split = self.fees.compute_split(ctx.order.price_at_order);
        let request = NewPaymentIntent {
            amount: ctx.order.price_at_order,
            currency: ctx.order.currency.clone(),
            order_id,
            description: format!("Order {} for service: {}", order_id, ctx.listing.title),
            destination_account: destination,
            platform_fee: split.platform_fee,
        };
        match self.gateway.create_payment_intent(request).await {
            Ok(intent) => {
                let transaction = NewPaymentTransaction::new(
                    order_id,
                    intent.intent_id.clone(),
                    ctx.order.price_at_order,
                    ctx.order.currency.clone(),
                )
                .with_response("Payment intent created");
                self.db.insert_transaction_with_order_status(transaction, OrderStatus::PendingConfirmation).await?;
                info!(
                    "🔄️💳️ Payment intent [{}] created for order {order_id}. Status set to PendingConfirmation",
                    intent.intent_id
                );
                Ok(intent)
            },
            Err(e) => {
                error!("🔄️💳️ Payment intent creation failed for order {order_id}. {e}");
                self.db.update_order_status(order_id, OrderStatus::PaymentFailed).await?;
                Err(OrderFlowError::Gateway(e))
            },
        }
    }

    /// Merges one gateway event into local state, idempotently.
    ///
    /// The event has already been signature-verified and mapped by the webhook boundary. A
    /// successful return means the event is durably applied (or durably recognised as a no-op /
    /// unmatched), so the caller may acknowledge the delivery. A [`StorageUnavailable`] error
    /// means nothing was acknowledged and the gateway should redeliver.
    ///
    /// [`StorageUnavailable`]: OrderFlowError::StorageUnavailable
    pub async fn reconcile_event(&self, event: GatewayEvent) -> Result<ReconcileOutcome, OrderFlowError> {
        match event {
            GatewayEvent::PaymentSucceeded { intent_id } => {
                self.apply_payment_event(intent_id, PaymentEventKind::Succeeded, "Payment succeeded via webhook".into())
                    .await
            },
            GatewayEvent::PaymentFailed { intent_id, failure_message } => {
                let message = format!(
                    "Payment failed: {}",
                    failure_message.as_deref().unwrap_or("No specific error message")
                );
                self.apply_payment_event(intent_id, PaymentEventKind::Failed, message).await
            },
            GatewayEvent::PaymentProcessing { intent_id } => {
                self.apply_payment_event(intent_id, PaymentEventKind::Processing, "Payment processing".into()).await
            },
            GatewayEvent::PaymentRefunded { intent_id } => {
                self.apply_payment_event(intent_id, PaymentEventKind::Refunded, "Payment refunded".into()).await
            },
            GatewayEvent::AccountUpdated(update) => {
                let onboarding_complete = update.onboarding_complete();
                let provider = self
                    .db
                    .update_provider_payment_readiness(
                        &update.connected_account_id,
                        onboarding_complete,
                        update.details_submitted,
                    )
                    .await?;
                match provider {
                    Some(p) => {
                        info!(
                            "🔄️🏦️ Connected account {} for provider {} updated. Payment ready: {}",
                            update.connected_account_id,
                            p.user_id,
                            p.is_payment_ready()
                        );
                        Ok(ReconcileOutcome::ProviderUpdated {
                            user_id: p.user_id.clone(),
                            payment_ready: p.is_payment_ready(),
                        })
                    },
                    None => {
                        warn!(
                            "🔄️🏦️ Account event for unknown connected account {}; ignoring",
                            update.connected_account_id
                        );
                        Ok(ReconcileOutcome::UnknownAccount { connected_account_id: update.connected_account_id })
                    },
                }
            },
        }
    }

    async fn apply_payment_event(
        &self,
        intent_id: IntentId,
        kind: PaymentEventKind,
        message: String,
    ) -> Result<ReconcileOutcome, OrderFlowError> {
        // First lookup is only to learn which order's lock to take.
        let transaction = match self.db.fetch_transaction_by_intent_id(&intent_id).await? {
            Some(t) => t,
            None => {
                warn!("🔄️💰️ No payment transaction found for intent [{intent_id}]; ignoring event");
                return Ok(ReconcileOutcome::Unmatched { intent_id });
            },
        };
        let order_id = transaction.order_id;
        let _guard = self.locks.acquire(order_id).await;
        // Re-read under the lock; the record may have moved since the unlocked peek.
        let transaction = match self.db.fetch_transaction_by_intent_id(&intent_id).await? {
            Some(t) => t,
            None => return Ok(ReconcileOutcome::Unmatched { intent_id }),
        };
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;

        let transaction_status = transitions::transaction_status_for(kind);
        let order_status = transitions::order_status_after_payment_event(order.status, kind);
        if transaction.status == transaction_status && order_status.is_none() {
            debug!("🔄️💰️ Event for intent [{intent_id}] already applied; nothing to do");
            return Ok(ReconcileOutcome::AlreadyApplied { order_id });
        }
        if !transaction.status.is_open() && transaction_status.is_open() {
            // Out-of-order delivery: a non-terminal event arrived after the intent settled.
            // Terminal outcomes win; nothing is written.
            info!(
                "🔄️💰️ Stale {transaction_status} event for settled intent [{intent_id}] ({}); ignoring",
                transaction.status
            );
            return Ok(ReconcileOutcome::AlreadyApplied { order_id });
        }
        if order_status.is_none() && kind != PaymentEventKind::Refunded {
            // The transaction record still moves (last-write-wins), but the order does not.
            info!(
                "🔄️💰️ Intent [{intent_id}] reported {transaction_status} but order {order_id} stays {}",
                order.status
            );
        }
        let update = PaymentUpdate {
            intent_id: intent_id.clone(),
            transaction_status,
            gateway_response: Some(truncate_to(message, GATEWAY_RESPONSE_MAX_LEN)),
            order_status,
        };
        let (transaction, order) = self.db.apply_payment_update(update).await?;
        if order_status.is_some() {
            info!(
                "🔄️💰️ Order {order_id} status updated to {} due to payment [{intent_id}] ({})",
                order.status, transaction.status
            );
        }
        Ok(ReconcileOutcome::Applied {
            order_id,
            order_status: order.status,
            transaction_status: transaction.status,
        })
    }

    /// Manual, provider- or admin-driven status change, validated against the explicit manual
    /// transition table. Providers can only touch their own orders; pass `None` for admins.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        acting_provider: Option<&UserId>,
    ) -> Result<Order, OrderFlowError> {
        let _guard = self.locks.acquire(order_id).await;
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if let Some(provider_id) = acting_provider {
            if order.provider_id != *provider_id {
                return Err(OrderFlowError::OrderNotFound(order_id));
            }
        }
        match transitions::manual_transition(order.status, new_status) {
            ManualTransition::Allowed(next) => {
                let order = self.db.update_order_status(order_id, next).await?;
                info!("🔄️📦️ Order {order_id} status manually updated to {next}");
                Ok(order)
            },
            ManualTransition::PaymentNotConfirmed => Err(OrderFlowError::PaymentNotConfirmed),
            ManualTransition::Forbidden => {
                Err(OrderFlowError::InvalidTransition { from: order.status, to: new_status })
            },
        }
    }

    /// Cancels an order that has not yet reached `Confirmed`. Later cancellations must go
    /// through a refund, which is a separate flow; they are rejected here. Pass `None` as the
    /// acting user for admins.
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        cancelled_by: CancelledBy,
        acting_user: Option<&UserId>,
    ) -> Result<Order, OrderFlowError> {
        let _guard = self.locks.acquire(order_id).await;
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if let Some(user_id) = acting_user {
            let owner = match cancelled_by {
                CancelledBy::Client => &order.client_id,
                CancelledBy::Provider => &order.provider_id,
            };
            if owner != user_id {
                return Err(OrderFlowError::OrderNotFound(order_id));
            }
        }
        let new_status = cancelled_by.order_status();
        if !transitions::is_cancellable(order.status) {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: new_status });
        }
        let order = self.db.update_order_status(order_id, new_status).await?;
        info!("🔄️📦️ Order {order_id} cancelled ({new_status})");
        Ok(order)
    }

    /// The order with its listing, provider record and full payment history, fetched eagerly.
    pub async fn order_details(&self, order_id: OrderId) -> Result<Option<OrderContext>, OrderFlowError> {
        Ok(self.db.fetch_order_context(order_id).await?)
    }
}
