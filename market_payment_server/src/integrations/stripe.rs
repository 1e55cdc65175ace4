//! Bridge between the engine's gateway contract and the Stripe adapter.
//!
//! Two mappings live here and nowhere else: decimal currency units to integer minor units for
//! outbound intent creation, and Stripe's wire events to the engine's closed [`GatewayEvent`]
//! enum for inbound webhooks. The engine never sees a Stripe payload shape.

use market_payment_engine::{
    events::{AccountStatusUpdate, GatewayEvent},
    traits::{GatewayError, NewPaymentIntent, PaymentGateway, PaymentIntent},
};
use stripe_tools::{EventParseError, PaymentIntentParams, StripeApi, StripeApiError, StripeConfig, StripeEvent};

//--------------------------------------    StripeGateway    ---------------------------------------------------------
#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        Ok(Self { api: StripeApi::new(config)? })
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let amount_minor = intent.amount.minor_units().map_err(|e| GatewayError::Rejected(e.to_string()))?;
        let application_fee_minor =
            intent.platform_fee.minor_units().map_err(|e| GatewayError::Rejected(e.to_string()))?;
        let params = PaymentIntentParams {
            amount_minor,
            currency: intent.currency,
            description: intent.description,
            destination_account: intent.destination_account,
            application_fee_minor,
            order_id: intent.order_id.0.to_string(),
        };
        let resource = self.api.create_payment_intent(params).await.map_err(map_api_error)?;
        let client_secret = resource
            .client_secret
            .ok_or_else(|| GatewayError::Transport("Stripe response did not include a client secret".into()))?;
        Ok(PaymentIntent { intent_id: resource.id.into(), client_secret })
    }
}

fn map_api_error(e: StripeApiError) -> GatewayError {
    match e {
        StripeApiError::Timeout => GatewayError::Timeout,
        StripeApiError::Api { message, .. } => GatewayError::Rejected(message),
        StripeApiError::Transport(m) | StripeApiError::Json(m) | StripeApiError::Initialization(m) => {
            GatewayError::Transport(m)
        },
    }
}

//--------------------------------------    Event mapping    ---------------------------------------------------------
/// Maps a verified Stripe event onto the engine's event model.
///
/// Returns `Ok(None)` for event types this system does not handle (they are acknowledged and
/// ignored), and an error when a handled event type carries a payload that does not parse.
pub fn gateway_event_from_stripe(event: &StripeEvent) -> Result<Option<GatewayEvent>, EventParseError> {
    let mapped = match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let pi = payment_intent_of(event)?;
            GatewayEvent::PaymentSucceeded { intent_id: pi.id.into() }
        },
        "payment_intent.payment_failed" => {
            let pi = payment_intent_of(event)?;
            let failure_message = pi.last_payment_error.and_then(|e| e.message);
            GatewayEvent::PaymentFailed { intent_id: pi.id.into(), failure_message }
        },
        "payment_intent.processing" => {
            let pi = payment_intent_of(event)?;
            GatewayEvent::PaymentProcessing { intent_id: pi.id.into() }
        },
        "charge.refunded" => {
            let charge = event
                .charge()
                .ok_or_else(|| EventParseError(format!("charge object missing in event {}", event.id)))?;
            match charge.payment_intent {
                Some(intent_id) => GatewayEvent::PaymentRefunded { intent_id: intent_id.into() },
                // A refund on a charge with no intent attached is nothing we track.
                None => return Ok(None),
            }
        },
        "account.updated" => {
            let account = event
                .account()
                .ok_or_else(|| EventParseError(format!("account object missing in event {}", event.id)))?;
            GatewayEvent::AccountUpdated(AccountStatusUpdate {
                connected_account_id: account.id,
                charges_enabled: account.charges_enabled,
                payouts_enabled: account.payouts_enabled,
                details_submitted: account.details_submitted,
            })
        },
        _ => return Ok(None),
    };
    Ok(Some(mapped))
}

fn payment_intent_of(event: &StripeEvent) -> Result<stripe_tools::data_objects::PaymentIntentObject, EventParseError> {
    event
        .payment_intent()
        .ok_or_else(|| EventParseError(format!("payment intent object missing in event {}", event.id)))
}

#[cfg(test)]
mod test {
    use super::*;
    use stripe_tools::parse_event;

    #[test]
    fn succeeded_events_map_to_the_engine_model() {
        let payload = br#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123" } }
        }"#;
        let event = parse_event(payload).unwrap();
        let mapped = gateway_event_from_stripe(&event).unwrap().unwrap();
        assert_eq!(mapped, GatewayEvent::PaymentSucceeded { intent_id: "pi_123".into() });
    }

    #[test]
    fn failure_messages_survive_the_mapping() {
        let payload = br#"{
            "id": "evt_2",
            "type": "payment_intent.payment_failed",
            "data": { "object": { "id": "pi_123", "last_payment_error": { "message": "declined" } } }
        }"#;
        let event = parse_event(payload).unwrap();
        let mapped = gateway_event_from_stripe(&event).unwrap().unwrap();
        assert_eq!(
            mapped,
            GatewayEvent::PaymentFailed { intent_id: "pi_123".into(), failure_message: Some("declined".into()) }
        );
    }

    #[test]
    fn account_events_carry_the_capability_flags() {
        let payload = br#"{
            "id": "evt_3",
            "type": "account.updated",
            "data": { "object": {
                "id": "acct_1",
                "charges_enabled": true,
                "payouts_enabled": false,
                "details_submitted": true
            } }
        }"#;
        let event = parse_event(payload).unwrap();
        let mapped = gateway_event_from_stripe(&event).unwrap().unwrap();
        match mapped {
            GatewayEvent::AccountUpdated(update) => {
                assert_eq!(update.connected_account_id, "acct_1");
                assert!(update.charges_enabled);
                assert!(!update.payouts_enabled);
                assert!(update.details_submitted);
                assert!(!update.onboarding_complete());
            },
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn unhandled_event_types_are_ignored() {
        let payload = br#"{
            "id": "evt_4",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        }"#;
        let event = parse_event(payload).unwrap();
        assert!(gateway_event_from_stripe(&event).unwrap().is_none());
    }

    #[test]
    fn handled_events_with_broken_payloads_are_errors() {
        let payload = br#"{
            "id": "evt_5",
            "type": "payment_intent.succeeded",
            "data": { "object": { "not_an_intent": true } }
        }"#;
        let event = parse_event(payload).unwrap();
        assert!(gateway_event_from_stripe(&event).is_err());
    }
}
