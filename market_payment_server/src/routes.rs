//! The checkout orchestrator: thin handlers that validate the acting identity's role and
//! delegate to the lifecycle engine. No business logic lives here.

use actix_web::{get, web, HttpResponse};
use log::*;
use market_payment_engine::{
    db_types::{CancelledBy, OrderId},
    traits::{LedgerStore, PaymentGateway},
    CheckoutRequest,
    OrderFlowApi,
    OrderFlowError,
};

use crate::{
    data_objects::{InitiatePaymentResponse, OrderWithHistory, UpdateStatusRequest},
    errors::{AuthError, ServerError},
    identity::{ActingUser, Role},
};

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("👍️\n")
}

/// POST /api/orders
pub async fn create_order<B, G>(
    user: ActingUser,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    user.require(Role::Client)?;
    let order = api.create_order(user.user_id.clone(), body.into_inner()).await?;
    debug!("🛒️ Order {} created by {}", order.id, user.user_id);
    Ok(HttpResponse::Created().json(order))
}

/// POST /api/orders/{id}/payment
pub async fn initiate_payment<B, G>(
    user: ActingUser,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    user.require(Role::Client)?;
    let order_id = OrderId(path.into_inner());
    let intent = api.initiate_payment(order_id, &user.user_id).await?;
    Ok(HttpResponse::Ok().json(InitiatePaymentResponse {
        order_id,
        intent_id: intent.intent_id,
        client_secret: intent.client_secret,
    }))
}

/// POST /api/orders/{id}/cancel
///
/// Clients cancel their own orders, providers their incoming ones. An admin cancellation is
/// recorded as provider-side.
pub async fn cancel_order<B, G>(
    user: ActingUser,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    let order_id = OrderId(path.into_inner());
    let (cancelled_by, acting_user) = match user.role {
        Role::Client => (CancelledBy::Client, Some(&user.user_id)),
        Role::Provider => (CancelledBy::Provider, Some(&user.user_id)),
        Role::Admin => (CancelledBy::Provider, None),
    };
    let order = api.cancel_order(order_id, cancelled_by, acting_user).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/orders/{id}/status
pub async fn update_status<B, G>(
    user: ActingUser,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    let order_id = OrderId(path.into_inner());
    let acting_provider = match user.role {
        Role::Provider => Some(&user.user_id),
        Role::Admin => None,
        Role::Client => {
            return Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(
                "Only providers and admins may update order status".into(),
            )))
        },
    };
    let order = api.update_status(order_id, body.into_inner().status, acting_provider).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// GET /api/orders/{id}
pub async fn order_details<B, G>(
    user: ActingUser,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    let order_id = OrderId(path.into_inner());
    let ctx = api.order_details(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
    let is_party = ctx.order.client_id == user.user_id || ctx.order.provider_id == user.user_id;
    if !is_party && !user.is_admin() {
        // Same response as a missing order; don't leak existence.
        return Err(ServerError::OrderFlow(OrderFlowError::OrderNotFound(order_id)));
    }
    Ok(HttpResponse::Ok().json(OrderWithHistory::from(ctx)))
}
