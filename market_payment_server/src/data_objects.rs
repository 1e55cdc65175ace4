use market_payment_engine::{
    db_types::{IntentId, Order, OrderId, OrderStatus, PaymentTransaction},
    traits::OrderContext,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Returned from payment initiation; the client secret feeds the user's payment form.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatePaymentResponse {
    pub order_id: OrderId,
    pub intent_id: IntentId,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// An order with its full payment history, for the details endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithHistory {
    pub order: Order,
    pub transactions: Vec<PaymentTransaction>,
}

impl From<OrderContext> for OrderWithHistory {
    fn from(ctx: OrderContext) -> Self {
        Self { order: ctx.order, transactions: ctx.transactions }
    }
}
