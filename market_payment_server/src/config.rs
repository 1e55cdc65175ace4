use std::env;

use log::*;
use mpg_common::USD_CURRENCY_CODE;
use rust_decimal::Decimal;
use stripe_tools::StripeConfig;

const DEFAULT_MPG_HOST: &str = "127.0.0.1";
const DEFAULT_MPG_PORT: u16 = 8480;

/// Immutable server configuration, built once at startup from environment variables and passed
/// by reference from there on. Secrets live inside [`StripeConfig`] behind `Secret` wrappers.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The currency orders are priced and settled in.
    pub currency: String,
    /// The platform fee rate declared to the gateway on every payment intent.
    pub fee_rate: Decimal,
    pub stripe: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MPG_HOST.to_string(),
            port: DEFAULT_MPG_PORT,
            database_url: String::default(),
            currency: USD_CURRENCY_CODE.to_string(),
            fee_rate: default_fee_rate(),
            stripe: StripeConfig::default(),
        }
    }
}

fn default_fee_rate() -> Decimal {
    // 10%
    Decimal::new(10, 2)
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MPG_HOST").ok().unwrap_or_else(|| DEFAULT_MPG_HOST.into());
        let port = env::var("MPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MPG_PORT. {e} Using the default, {DEFAULT_MPG_PORT}, instead."
                    );
                    DEFAULT_MPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MPG_PORT);
        let database_url = env::var("MPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MPG_DATABASE_URL is not set. Please set it to the URL for the ledger database.");
            String::default()
        });
        let currency = env::var("MPG_CURRENCY").ok().unwrap_or_else(|| USD_CURRENCY_CODE.to_string());
        let fee_rate = env::var("MPG_FEE_RATE")
            .ok()
            .and_then(|s| {
                s.parse::<Decimal>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MPG_FEE_RATE ({s}). {e}"))
                    .ok()
            })
            .unwrap_or_else(|| {
                info!("🪛️ MPG_FEE_RATE is not set. Using the default platform fee of 10%.");
                default_fee_rate()
            });
        let stripe = StripeConfig::new_from_env_or_default();
        Self { host, port, database_url, currency, fee_rate, stripe }
    }
}
