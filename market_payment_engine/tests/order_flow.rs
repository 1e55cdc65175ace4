//! Checkout-side lifecycle tests: creation guards, payment initiation, manual status changes and
//! cancellation rules.

mod support;

use market_payment_engine::{
    db_types::{CancelledBy, OrderStatus, PaymentStatus, UserId},
    traits::{GatewayError, LedgerStore},
    CheckoutRequest, OrderFlowError, Precondition,
};
use support::{seeded_api, tutoring_listing, CLIENT, CONNECTED_ACCOUNT, LISTING, PROVIDER};

fn checkout() -> CheckoutRequest {
    CheckoutRequest { listing_id: LISTING, client_note: None, scheduled_at: None }
}

fn client() -> UserId {
    CLIENT.into()
}

#[tokio::test]
async fn create_order_locks_in_the_listing_price() {
    let (api, db, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.price_at_order, "50.00".parse().unwrap());
    assert_eq!(order.provider_id, PROVIDER.into());

    // Listing price drift must not affect the in-flight order.
    let mut listing = tutoring_listing();
    listing.price = "80.00".parse().unwrap();
    db.upsert_listing(listing).await.unwrap();

    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.price_at_order, "50.00".parse().unwrap());
}

#[tokio::test]
async fn create_order_rejects_inactive_listings() {
    let (api, db, _) = seeded_api().await;
    let mut listing = tutoring_listing();
    listing.is_active = false;
    db.upsert_listing(listing).await.unwrap();
    let err = api.create_order(client(), checkout()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PreconditionFailed(Precondition::ListingUnavailable)));
}

#[tokio::test]
async fn create_order_rejects_self_purchase() {
    let (api, _, _) = seeded_api().await;
    let err = api.create_order(PROVIDER.into(), checkout()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PreconditionFailed(Precondition::SelfPurchase)));
}

#[tokio::test]
async fn create_order_rejects_unready_provider() {
    let (api, db, _) = seeded_api().await;
    let mut provider = support::ready_provider();
    provider.onboarding_complete = false;
    db.upsert_provider(provider).await.unwrap();
    let err = api.create_order(client(), checkout()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PreconditionFailed(Precondition::ProviderNotPaymentReady)));
}

#[tokio::test]
async fn initiate_payment_opens_one_intent_with_the_declared_fee() {
    let (api, _, gateway) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    let intent = api.initiate_payment(order.id, &client()).await.unwrap();
    assert_eq!(intent.intent_id, "pi_0001".into());
    assert!(!intent.client_secret.is_empty());

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, "50.00".parse().unwrap());
    assert_eq!(requests[0].platform_fee, "5.00".parse().unwrap());
    assert_eq!(requests[0].destination_account, CONNECTED_ACCOUNT);
    assert_eq!(requests[0].currency, "usd");

    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingConfirmation);
    assert_eq!(details.transactions.len(), 1);
    assert_eq!(details.transactions[0].status, PaymentStatus::Pending);
    assert_eq!(details.transactions[0].amount, "50.00".parse().unwrap());
}

#[tokio::test]
async fn second_initiation_is_rejected_while_a_payment_is_in_flight() {
    let (api, _, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    api.initiate_payment(order.id, &client()).await.unwrap();
    let err = api.initiate_payment(order.id, &client()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PaymentAlreadyInFlight));

    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.transactions.len(), 1);
}

#[tokio::test]
async fn concurrent_initiations_yield_exactly_one_transaction() {
    let (api, _, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    let requester = client();
    let (a, b) = tokio::join!(api.initiate_payment(order.id, &requester), api.initiate_payment(order.id, &requester));
    assert_eq!(a.is_ok() as usize + b.is_ok() as usize, 1);
    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.transactions.len(), 1);
}

#[tokio::test]
async fn gateway_rejection_marks_the_order_payment_failed() {
    let (api, _, gateway) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    gateway.fail_next(GatewayError::Rejected("Your card was declined".into()));
    let err = api.initiate_payment(order.id, &client()).await.unwrap_err();
    match err {
        OrderFlowError::Gateway(GatewayError::Rejected(msg)) => assert_eq!(msg, "Your card was declined"),
        other => panic!("unexpected error: {other}"),
    }
    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PaymentFailed);
    assert!(details.transactions.is_empty());

    // Payment can be re-initiated from PaymentFailed.
    api.initiate_payment(order.id, &client()).await.unwrap();
    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingConfirmation);
}

#[tokio::test]
async fn gateway_timeout_leaves_the_order_in_payment_failed() {
    let (api, _, gateway) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    gateway.fail_next(GatewayError::Timeout);
    let err = api.initiate_payment(order.id, &client()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Gateway(GatewayError::Timeout)));
    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PaymentFailed);
    assert!(details.transactions.is_empty());
}

#[tokio::test]
async fn readiness_flip_after_creation_blocks_initiation() {
    let (api, db, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    let mut provider = support::ready_provider();
    provider.onboarding_complete = false;
    db.upsert_provider(provider).await.unwrap();

    let err = api.initiate_payment(order.id, &client()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PreconditionFailed(Precondition::ProviderNotPaymentReady)));
    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingPayment);
}

#[tokio::test]
async fn foreign_orders_are_invisible_to_other_clients() {
    let (api, _, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    let err = api.initiate_payment(order.id, &"client-2".into()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(_)));
}

#[tokio::test]
async fn completion_requires_a_confirmed_payment() {
    let (api, _, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    api.initiate_payment(order.id, &client()).await.unwrap();

    let err = api.update_status(order.id, OrderStatus::Completed, None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PaymentNotConfirmed));
    let details = api.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingConfirmation);
}

#[tokio::test]
async fn providers_can_only_update_their_own_orders() {
    let (api, _, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    let someone_else: UserId = "provider-2".into();
    let err = api.update_status(order.id, OrderStatus::Completed, Some(&someone_else)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(_)));
}

#[tokio::test]
async fn cancellation_is_allowed_before_confirmation_only() {
    let (api, _, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    let cancelled = api.cancel_order(order.id, CancelledBy::Client, Some(&client())).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::CancelledByClient);

    // Once cancelled, nothing else may move the order.
    let err = api.cancel_order(order.id, CancelledBy::Provider, None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn completed_orders_must_be_refunded_not_cancelled() {
    let (api, db, _) = seeded_api().await;
    let order = api.create_order(client(), checkout()).await.unwrap();
    db.update_order_status(order.id, OrderStatus::Completed).await.unwrap();
    let err = api.cancel_order(order.id, CancelledBy::Client, Some(&client())).await.unwrap_err();
    assert!(matches!(
        err,
        OrderFlowError::InvalidTransition { from: OrderStatus::Completed, to: OrderStatus::CancelledByClient }
    ));
}
