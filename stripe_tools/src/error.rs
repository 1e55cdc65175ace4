use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StripeApiError {
    #[error("Could not initialize the Stripe client. {0}")]
    Initialization(String),
    #[error("The Stripe API request timed out")]
    Timeout,
    #[error("Could not reach the Stripe API. {0}")]
    Transport(String),
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Could not deserialize the Stripe response. {0}")]
    Json(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The Stripe-Signature header is missing or malformed")]
    MalformedHeader,
    #[error("The event timestamp is outside the allowed tolerance")]
    StaleTimestamp,
    #[error("The signature does not match the payload")]
    Mismatch,
}

#[derive(Debug, Clone, Error)]
#[error("Could not parse the webhook event. {0}")]
pub struct EventParseError(pub String);

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Parse(#[from] EventParseError),
}
