//! Shared fixtures for the engine integration tests: a seeded in-memory ledger and a scripted
//! stand-in for the payment gateway.

use std::sync::{Arc, Mutex};

use market_payment_engine::{
    db_types::{Listing, ListingId, ProviderAccount},
    fees::FeeSchedule,
    memory::MemoryLedger,
    traits::{GatewayError, LedgerStore, NewPaymentIntent, PaymentGateway, PaymentIntent},
    OrderFlowApi,
};

pub const CLIENT: &str = "client-1";
pub const PROVIDER: &str = "provider-1";
pub const CONNECTED_ACCOUNT: &str = "acct_0001";
pub const LISTING: ListingId = ListingId(1);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//--------------------------------------     TestGateway     ---------------------------------------------------------
/// Gateway double: hands out sequential intent ids, records every request, and can be told to
/// fail the next call.
#[derive(Clone, Default)]
pub struct TestGateway {
    state: Arc<Mutex<GatewayState>>,
}

#[derive(Default)]
struct GatewayState {
    requests: Vec<NewPaymentIntent>,
    next_error: Option<GatewayError>,
    counter: u64,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: GatewayError) {
        self.state.lock().unwrap().next_error = Some(error);
    }

    pub fn requests(&self) -> Vec<NewPaymentIntent> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl PaymentGateway for TestGateway {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        state.counter += 1;
        let intent_id = format!("pi_{:04}", state.counter);
        state.requests.push(intent);
        Ok(PaymentIntent { intent_id: intent_id.clone().into(), client_secret: format!("{intent_id}_secret") })
    }
}

//--------------------------------------      Fixtures       ---------------------------------------------------------
pub fn tutoring_listing() -> Listing {
    Listing {
        id: LISTING,
        provider_id: PROVIDER.into(),
        title: "Maths tutoring".into(),
        price: "50.00".parse().unwrap(),
        is_active: true,
    }
}

pub fn ready_provider() -> ProviderAccount {
    ProviderAccount {
        user_id: PROVIDER.into(),
        connected_account_id: Some(CONNECTED_ACCOUNT.into()),
        onboarding_complete: true,
        details_submitted: true,
    }
}

/// An engine over a freshly seeded in-memory ledger: one active listing owned by one
/// payment-ready provider, 10% fee schedule, USD.
pub async fn seeded_api() -> (OrderFlowApi<MemoryLedger, TestGateway>, MemoryLedger, TestGateway) {
    init_logging();
    let db = MemoryLedger::new();
    db.upsert_listing(tutoring_listing()).await.unwrap();
    db.upsert_provider(ready_provider()).await.unwrap();
    let gateway = TestGateway::new();
    let api = OrderFlowApi::new(db.clone(), gateway.clone(), FeeSchedule::standard(), "usd");
    (api, db, gateway)
}
