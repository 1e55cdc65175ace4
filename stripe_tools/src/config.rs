use std::{env, time::Duration};

use log::*;
use mpg_common::{parse_boolean_flag, Secret};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";
/// Requests against the gateway are bounded; a hung call must not hold an order hostage.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// Webhook events older than this are treated as replays and rejected.
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub api_base: String,
    /// The API secret key, sent as a bearer token on every REST call.
    pub secret_key: Secret<String>,
    /// The endpoint secret used to verify webhook signatures.
    pub webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked and every delivery is accepted. **DANGER**:
    /// for local development against replayed fixtures only.
    pub signature_checks: bool,
    pub request_timeout: Duration,
    pub signature_tolerance_secs: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            signature_checks: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            signature_tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = env::var("MPG_STRIPE_API_BASE").ok().unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let secret_key = env::var("MPG_STRIPE_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ MPG_STRIPE_SECRET_KEY is not set. Please set it to your Stripe API secret key.");
            String::default()
        });
        let webhook_secret = env::var("MPG_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ MPG_STRIPE_WEBHOOK_SECRET is not set. Please set it to your webhook endpoint secret.");
            String::default()
        });
        let signature_checks = parse_boolean_flag(env::var("MPG_STRIPE_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Do not run like this in production.");
        }
        let request_timeout = env::var("MPG_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MPG_GATEWAY_TIMEOUT_SECS. {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let signature_tolerance_secs = env::var("MPG_STRIPE_SIGNATURE_TOLERANCE_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MPG_STRIPE_SIGNATURE_TOLERANCE_SECS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECS);
        Self {
            api_base,
            secret_key: Secret::new(secret_key),
            webhook_secret: Secret::new(webhook_secret),
            signature_checks,
            request_timeout,
            signature_tolerance_secs,
        }
    }
}
