//! Webhook reconciliation tests: idempotent replays, out-of-order deliveries, unmatched intents
//! and account-readiness events.

mod support;

use market_payment_engine::{
    db_types::{IntentId, Order, OrderStatus, PaymentStatus, PaymentTransaction, UserId},
    events::{AccountStatusUpdate, GatewayEvent},
    traits::PaymentIntent,
    CheckoutRequest, ReconcileOutcome,
};
use support::{seeded_api, CLIENT, CONNECTED_ACCOUNT, LISTING};

fn checkout() -> CheckoutRequest {
    CheckoutRequest { listing_id: LISTING, client_note: None, scheduled_at: None }
}

fn client() -> UserId {
    CLIENT.into()
}

fn succeeded(intent: &PaymentIntent) -> GatewayEvent {
    GatewayEvent::PaymentSucceeded { intent_id: intent.intent_id.clone() }
}

fn processing(intent: &PaymentIntent) -> GatewayEvent {
    GatewayEvent::PaymentProcessing { intent_id: intent.intent_id.clone() }
}

fn failed(intent: &PaymentIntent, message: &str) -> GatewayEvent {
    GatewayEvent::PaymentFailed { intent_id: intent.intent_id.clone(), failure_message: Some(message.into()) }
}

type Api = market_payment_engine::OrderFlowApi<market_payment_engine::MemoryLedger, support::TestGateway>;

/// Creates an order and opens its payment intent.
async fn order_with_intent(api: &Api) -> (Order, PaymentIntent) {
    let order = api.create_order(client(), checkout()).await.unwrap();
    let intent = api.initiate_payment(order.id, &client()).await.unwrap();
    (order, intent)
}

async fn state_of(api: &Api, order: &Order) -> (OrderStatus, Vec<PaymentTransaction>) {
    let details = api.order_details(order.id).await.unwrap().unwrap();
    (details.order.status, details.transactions)
}

#[tokio::test]
async fn succeeded_event_confirms_order_and_transaction() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;

    let outcome = api.reconcile_event(succeeded(&intent)).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            order_id: order.id,
            order_status: OrderStatus::Confirmed,
            transaction_status: PaymentStatus::Succeeded,
        }
    );
    let (status, transactions) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::Confirmed);
    assert_eq!(transactions[0].status, PaymentStatus::Succeeded);
    assert_eq!(transactions[0].gateway_response.as_deref(), Some("Payment succeeded via webhook"));
}

#[tokio::test]
async fn replaying_a_succeeded_event_is_a_no_op() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;

    api.reconcile_event(succeeded(&intent)).await.unwrap();
    let (status_once, transactions_once) = state_of(&api, &order).await;

    let outcome = api.reconcile_event(succeeded(&intent)).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyApplied { order_id: order.id });

    // Identical state, including timestamps: the replay wrote nothing.
    let (status_twice, transactions_twice) = state_of(&api, &order).await;
    assert_eq!(status_once, status_twice);
    assert_eq!(transactions_once, transactions_twice);
}

#[tokio::test]
async fn processing_after_succeeded_does_not_regress() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;

    api.reconcile_event(succeeded(&intent)).await.unwrap();
    let outcome = api.reconcile_event(processing(&intent)).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyApplied { order_id: order.id });

    let (status, transactions) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::Confirmed);
    assert_eq!(transactions[0].status, PaymentStatus::Succeeded);
}

#[tokio::test]
async fn processing_then_succeeded_is_the_ordinary_path() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;

    api.reconcile_event(processing(&intent)).await.unwrap();
    let (status, transactions) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::PaymentProcessing);
    assert_eq!(transactions[0].status, PaymentStatus::Processing);

    api.reconcile_event(succeeded(&intent)).await.unwrap();
    let (status, transactions) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::Confirmed);
    assert_eq!(transactions[0].status, PaymentStatus::Succeeded);
}

#[tokio::test]
async fn failed_event_marks_order_payment_failed_with_the_gateway_message() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;

    api.reconcile_event(failed(&intent, "insufficient funds")).await.unwrap();
    let (status, transactions) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::PaymentFailed);
    assert_eq!(transactions[0].status, PaymentStatus::Failed);
    assert_eq!(transactions[0].gateway_response.as_deref(), Some("Payment failed: insufficient funds"));
}

#[tokio::test]
async fn late_failure_after_success_leaves_the_order_confirmed() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;

    api.reconcile_event(succeeded(&intent)).await.unwrap();
    api.reconcile_event(failed(&intent, "network blip")).await.unwrap();

    let (status, _) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn unmatched_intents_are_logged_and_ignored() {
    let (api, _, _) = seeded_api().await;
    let (order, _) = order_with_intent(&api).await;
    let before = state_of(&api, &order).await;

    let stray = GatewayEvent::PaymentSucceeded { intent_id: IntentId::from("pi_does_not_exist") };
    let outcome = api.reconcile_event(stray).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unmatched { intent_id: IntentId::from("pi_does_not_exist") });

    // Never fabricate a transaction from a webhook; nothing may change.
    assert_eq!(state_of(&api, &order).await, before);
}

#[tokio::test]
async fn refunds_touch_the_transaction_but_not_the_order() {
    let (api, _, _) = seeded_api().await;
    let (order, intent) = order_with_intent(&api).await;
    api.reconcile_event(succeeded(&intent)).await.unwrap();
    api.update_status(order.id, OrderStatus::Completed, None).await.unwrap();

    api.reconcile_event(GatewayEvent::PaymentRefunded { intent_id: intent.intent_id.clone() }).await.unwrap();
    let (status, transactions) = state_of(&api, &order).await;
    assert_eq!(status, OrderStatus::Completed);
    assert_eq!(transactions[0].status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn account_events_flip_provider_readiness() {
    let (api, _, _) = seeded_api().await;

    let off = GatewayEvent::AccountUpdated(AccountStatusUpdate {
        connected_account_id: CONNECTED_ACCOUNT.into(),
        charges_enabled: false,
        payouts_enabled: true,
        details_submitted: true,
    });
    let outcome = api.reconcile_event(off).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::ProviderUpdated { user_id: support::PROVIDER.into(), payment_ready: false });

    // With the provider knocked out, order creation is now guarded off.
    let err = api.create_order(client(), checkout()).await.unwrap_err();
    assert!(matches!(
        err,
        market_payment_engine::OrderFlowError::PreconditionFailed(
            market_payment_engine::Precondition::ProviderNotPaymentReady
        )
    ));

    let on = GatewayEvent::AccountUpdated(AccountStatusUpdate {
        connected_account_id: CONNECTED_ACCOUNT.into(),
        charges_enabled: true,
        payouts_enabled: true,
        details_submitted: true,
    });
    let outcome = api.reconcile_event(on).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::ProviderUpdated { user_id: support::PROVIDER.into(), payment_ready: true });
    api.create_order(client(), checkout()).await.unwrap();
}

#[tokio::test]
async fn unknown_connected_accounts_are_ignored() {
    let (api, _, _) = seeded_api().await;
    let event = GatewayEvent::AccountUpdated(AccountStatusUpdate {
        connected_account_id: "acct_unknown".into(),
        charges_enabled: true,
        payouts_enabled: true,
        details_submitted: true,
    });
    let outcome = api.reconcile_event(event).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::UnknownAccount { connected_account_id: "acct_unknown".into() });
}
