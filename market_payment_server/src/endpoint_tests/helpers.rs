//! Shared plumbing for endpoint tests: an app over the in-memory ledger and a scripted gateway,
//! plus request/signature helpers.

use std::sync::{Arc, Mutex};

use actix_http::Request;
use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceResponse},
    test,
    web,
    App,
    Error,
};
use hmac::{Hmac, Mac};
use market_payment_engine::{
    db_types::{Listing, ListingId, ProviderAccount},
    fees::FeeSchedule,
    memory::MemoryLedger,
    traits::{GatewayError, LedgerStore, NewPaymentIntent, PaymentGateway, PaymentIntent},
    OrderFlowApi,
};
use mpg_common::Secret;
use sha2::Sha256;
use stripe_tools::StripeConfig;

use crate::{routes, webhook_routes};

pub const CLIENT: &str = "client-1";
pub const PROVIDER: &str = "provider-1";
pub const CONNECTED_ACCOUNT: &str = "acct_0001";
pub const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//--------------------------------------     TestGateway     ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct TestGateway {
    state: Arc<Mutex<GatewayState>>,
}

#[derive(Default)]
struct GatewayState {
    next_error: Option<GatewayError>,
    counter: u64,
}

impl TestGateway {
    pub fn fail_next(&self, error: GatewayError) {
        self.state.lock().unwrap().next_error = Some(error);
    }
}

impl PaymentGateway for TestGateway {
    async fn create_payment_intent(&self, _intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        state.counter += 1;
        let intent_id = format!("pi_{:04}", state.counter);
        Ok(PaymentIntent { intent_id: intent_id.clone().into(), client_secret: format!("{intent_id}_secret") })
    }
}

//--------------------------------------     Test state      ---------------------------------------------------------
#[derive(Clone)]
pub struct TestState {
    pub db: MemoryLedger,
    pub gateway: TestGateway,
}

/// A ledger seeded with one active listing from one payment-ready provider.
pub async fn seeded_state() -> TestState {
    init_logging();
    let db = MemoryLedger::new();
    db.upsert_listing(Listing {
        id: ListingId(1),
        provider_id: PROVIDER.into(),
        title: "Maths tutoring".into(),
        price: "50.00".parse().unwrap(),
        is_active: true,
    })
    .await
    .unwrap();
    db.upsert_provider(ProviderAccount {
        user_id: PROVIDER.into(),
        connected_account_id: Some(CONNECTED_ACCOUNT.into()),
        onboarding_complete: true,
        details_submitted: true,
    })
    .await
    .unwrap();
    TestState { db, gateway: TestGateway::default() }
}

pub fn stripe_config() -> StripeConfig {
    StripeConfig { webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()), ..Default::default() }
}

pub fn engine_for(state: &TestState) -> OrderFlowApi<MemoryLedger, TestGateway> {
    OrderFlowApi::new(state.db.clone(), state.gateway.clone(), FeeSchedule::standard(), "usd")
}

/// Builds the app exactly as the server wires it, over the test state.
pub async fn test_app(
    state: TestState,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(engine_for(&state)))
            .app_data(web::Data::new(stripe_config()))
            .service(routes::health)
            .service(
                web::scope("/api")
                    .route("/orders", web::post().to(routes::create_order::<MemoryLedger, TestGateway>))
                    .route("/orders/{id}", web::get().to(routes::order_details::<MemoryLedger, TestGateway>))
                    .route("/orders/{id}/payment", web::post().to(routes::initiate_payment::<MemoryLedger, TestGateway>))
                    .route("/orders/{id}/cancel", web::post().to(routes::cancel_order::<MemoryLedger, TestGateway>))
                    .route("/orders/{id}/status", web::post().to(routes::update_status::<MemoryLedger, TestGateway>)),
            )
            .service(
                web::scope("/stripe")
                    .route("/webhook", web::post().to(webhook_routes::stripe_webhook::<MemoryLedger, TestGateway>)),
            ),
    )
    .await
}

/// A `t=...,v1=...` signature header over the payload, as Stripe would send it.
pub fn signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
