//! Thin adapter to the Stripe API.
//!
//! This crate knows the wire formats: creating payment intents over REST and verifying/parsing
//! inbound webhook events. It carries no business logic and no local state; the lifecycle engine
//! never sees a Stripe payload shape, only the fields the server layer extracts.
mod api;
mod config;
mod error;
mod webhook;

pub mod data_objects;

pub use api::{PaymentIntentParams, StripeApi};
pub use config::StripeConfig;
pub use data_objects::StripeEvent;
pub use error::{EventParseError, SignatureError, StripeApiError, WebhookError};
pub use webhook::{parse_event, verify_and_parse, verify_signature, verify_signature_at};
