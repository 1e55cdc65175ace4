use actix_web::{http::StatusCode, test};
use market_payment_engine::db_types::{Order, OrderStatus};
use serde_json::json;

use super::helpers::{seeded_state, signature_header, test_app, TestState, CLIENT, WEBHOOK_SECRET};
use crate::webhook_routes::SIGNATURE_HEADER;

/// Creates an order with an open payment intent, driving the engine directly against the shared
/// test ledger.
async fn order_with_intent(state: &TestState) -> (Order, String) {
    let engine = super::helpers::engine_for(state);
    let order = engine
        .create_order(
            CLIENT.into(),
            market_payment_engine::CheckoutRequest { listing_id: 1.into(), client_note: None, scheduled_at: None },
        )
        .await
        .unwrap();
    let intent = engine.initiate_payment(order.id, &CLIENT.into()).await.unwrap();
    (order, intent.intent_id.to_string())
}

fn succeeded_payload(intent_id: &str) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": intent_id } }
    })
    .to_string()
    .into_bytes()
}

#[actix_web::test]
async fn unsigned_webhooks_mutate_nothing() {
    let state = seeded_state().await;
    let (order, intent_id) = order_with_intent(&state).await;
    let engine = super::helpers::engine_for(&state);
    let app = test_app(state).await;

    let payload = succeeded_payload(&intent_id);
    let req = test::TestRequest::post().uri("/stripe/webhook").set_payload(payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let details = engine.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingConfirmation);
}

#[actix_web::test]
async fn badly_signed_webhooks_are_forbidden() {
    let state = seeded_state().await;
    let (order, intent_id) = order_with_intent(&state).await;
    let engine = super::helpers::engine_for(&state);
    let app = test_app(state).await;

    let payload = succeeded_payload(&intent_id);
    let header = signature_header(&payload, "not_the_endpoint_secret");
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let details = engine.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingConfirmation);
}

#[actix_web::test]
async fn signed_success_events_confirm_the_order() {
    let state = seeded_state().await;
    let (order, intent_id) = order_with_intent(&state).await;
    let engine = super::helpers::engine_for(&state);
    let app = test_app(state).await;

    let payload = succeeded_payload(&intent_id);
    let header = signature_header(&payload, WEBHOOK_SECRET);
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let details = engine.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::Confirmed);

    // Redelivery of the same event acknowledges without further writes.
    let header = signature_header(&payload, WEBHOOK_SECRET);
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let details = engine.order_details(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.status, OrderStatus::Confirmed);
}

#[actix_web::test]
async fn well_signed_garbage_is_a_bad_request() {
    let state = seeded_state().await;
    let app = test_app(state).await;

    let payload = b"this is not json".to_vec();
    let header = signature_header(&payload, WEBHOOK_SECRET);
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unhandled_event_types_are_acknowledged() {
    let state = seeded_state().await;
    let app = test_app(state).await;

    let payload = json!({
        "id": "evt_9",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string()
    .into_bytes();
    let header = signature_header(&payload, WEBHOOK_SECRET);
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
