//! The inbound webhook boundary.
//!
//! Stripe retries any delivery that does not get a 2xx, so the response code is part of the
//! reconciliation protocol: 2xx is only returned once the event has been durably applied (or
//! durably recognised as already applied / not applicable). A transient storage failure answers
//! 503 so the delivery is retried; signature and payload problems answer 4xx and are never
//! retried into the ledger.

use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use market_payment_engine::{
    traits::{LedgerStore, PaymentGateway},
    OrderFlowApi,
    OrderFlowError,
    ReconcileOutcome,
};
use stripe_tools::{StripeConfig, WebhookError};

use crate::{data_objects::JsonResponse, integrations::stripe::gateway_event_from_stripe};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// POST /stripe/webhook
pub async fn stripe_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
    config: web::Data<StripeConfig>,
) -> HttpResponse
where
    B: LedgerStore,
    G: PaymentGateway,
{
    let event = if config.signature_checks {
        let signature = match req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(s) => s,
            None => {
                warn!("🔐️ Webhook call without a {SIGNATURE_HEADER} header; denying");
                return HttpResponse::BadRequest().json(JsonResponse::failure("Missing signature header"));
            },
        };
        match stripe_tools::verify_and_parse(
            &body,
            signature,
            config.webhook_secret.reveal(),
            config.signature_tolerance_secs,
        ) {
            Ok(event) => event,
            Err(WebhookError::Signature(e)) => {
                warn!("🔐️ Webhook signature rejected: {e}");
                return HttpResponse::Forbidden().json(JsonResponse::failure("Invalid signature"));
            },
            Err(WebhookError::Parse(e)) => {
                warn!("💳️ Webhook payload rejected: {e}");
                return HttpResponse::BadRequest().json(JsonResponse::failure("Malformed payload"));
            },
        }
    } else {
        trace!("🔐️ Signature checks are disabled. Accepting delivery as-is");
        match stripe_tools::parse_event(&body) {
            Ok(event) => event,
            Err(e) => {
                warn!("💳️ Webhook payload rejected: {e}");
                return HttpResponse::BadRequest().json(JsonResponse::failure("Malformed payload"));
            },
        }
    };
    debug!("💳️ Received Stripe webhook: type='{}', id='{}'", event.event_type, event.id);
    let mapped = match gateway_event_from_stripe(&event) {
        Ok(Some(mapped)) => mapped,
        Ok(None) => {
            info!("💳️ Unhandled Stripe event type: {}", event.event_type);
            return HttpResponse::Ok().json(JsonResponse::success("Event ignored"));
        },
        Err(e) => {
            warn!("💳️ Could not extract event data from '{}' event {}: {e}", event.event_type, event.id);
            return HttpResponse::BadRequest().json(JsonResponse::failure("Malformed event payload"));
        },
    };
    match api.reconcile_event(mapped).await {
        Ok(outcome) => {
            let message = match outcome {
                ReconcileOutcome::Applied { order_id, order_status, .. } => {
                    format!("Event applied; order {order_id} is {order_status}")
                },
                ReconcileOutcome::AlreadyApplied { order_id } => {
                    format!("Event already applied to order {order_id}")
                },
                ReconcileOutcome::Unmatched { intent_id } => {
                    format!("No transaction matches intent {intent_id}")
                },
                ReconcileOutcome::ProviderUpdated { user_id, payment_ready } => {
                    format!("Provider {user_id} updated; payment ready: {payment_ready}")
                },
                ReconcileOutcome::UnknownAccount { connected_account_id } => {
                    format!("No provider tracks account {connected_account_id}")
                },
            };
            HttpResponse::Ok().json(JsonResponse::success(message))
        },
        Err(OrderFlowError::StorageUnavailable(e)) => {
            // Do not acknowledge: the ledger write did not happen and the gateway must retry.
            error!("💳️ Could not persist webhook event {}: {e}", event.id);
            HttpResponse::ServiceUnavailable().json(JsonResponse::failure("Storage unavailable"))
        },
        Err(e) => {
            error!("💳️ Unexpected error while reconciling webhook event {}: {e}", event.id);
            HttpResponse::InternalServerError().json(JsonResponse::failure("Unexpected error"))
        },
    }
}
