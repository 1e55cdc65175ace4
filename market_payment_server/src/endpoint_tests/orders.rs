use actix_web::{http::StatusCode, test};
use market_payment_engine::db_types::OrderStatus;
use serde_json::{json, Value};

use super::helpers::{seeded_state, test_app, CLIENT, PROVIDER};
use crate::identity::{USER_ID_HEADER, USER_ROLE_HEADER};

#[actix_web::test]
async fn requests_without_an_identity_are_unauthorized() {
    let app = test_app(seeded_state().await).await;
    let req = test::TestRequest::post().uri("/api/orders").set_json(json!({ "listing_id": 1 })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn providers_may_not_order_listings() {
    let app = test_app(seeded_state().await).await;
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header((USER_ID_HEADER, "some-other-provider"))
        .insert_header((USER_ROLE_HEADER, "Provider"))
        .set_json(json!({ "listing_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn checkout_flow_creates_an_order_and_opens_an_intent() {
    let app = test_app(seeded_state().await).await;
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header((USER_ID_HEADER, CLIENT))
        .insert_header((USER_ROLE_HEADER, "Client"))
        .set_json(json!({ "listing_id": 1, "client_note": "after 5pm please" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;
    assert_eq!(order["status"], "PendingPayment");
    assert_eq!(order["price_at_order"], "50.00");
    let order_id = order["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{order_id}/payment"))
        .insert_header((USER_ID_HEADER, CLIENT))
        .insert_header((USER_ROLE_HEADER, "Client"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["intent_id"], "pi_0001");
    assert_eq!(body["client_secret"], "pi_0001_secret");

    // Second attempt while the first intent is open is a conflict.
    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{order_id}/payment"))
        .insert_header((USER_ID_HEADER, CLIENT))
        .insert_header((USER_ROLE_HEADER, "Client"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn premature_completion_is_a_conflict() {
    let state = seeded_state().await;
    let engine = super::helpers::engine_for(&state);
    let order = engine
        .create_order(
            CLIENT.into(),
            market_payment_engine::CheckoutRequest { listing_id: 1.into(), client_note: None, scheduled_at: None },
        )
        .await
        .unwrap();

    let app = test_app(state).await;
    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{}/status", order.id.0))
        .insert_header((USER_ID_HEADER, PROVIDER))
        .insert_header((USER_ROLE_HEADER, "Provider"))
        .set_json(json!({ "status": "Completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn order_details_are_party_only() {
    let state = seeded_state().await;
    let engine = super::helpers::engine_for(&state);
    let order = engine
        .create_order(
            CLIENT.into(),
            market_payment_engine::CheckoutRequest { listing_id: 1.into(), client_note: None, scheduled_at: None },
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);

    let app = test_app(state).await;
    let uri = format!("/api/orders/{}", order.id.0);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header((USER_ID_HEADER, "snooping-client"))
        .insert_header((USER_ROLE_HEADER, "Client"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header((USER_ID_HEADER, PROVIDER))
        .insert_header((USER_ROLE_HEADER, "Provider"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["order"]["client_note"], Value::Null);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 0);
}
