use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::{
    data_objects::{ErrorResponse, PaymentIntentResource},
    StripeApiError,
    StripeConfig,
};

//--------------------------------------  PaymentIntentParams --------------------------------------------------------
/// Parameters for creating one payment intent. Amounts are integer minor units; the conversion
/// from decimal currency units happens before this boundary is crossed, nowhere else.
#[derive(Debug, Clone)]
pub struct PaymentIntentParams {
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    /// Connected account the settled funds are transferred to.
    pub destination_account: String,
    /// The platform's cut, deducted by Stripe at settlement.
    pub application_fee_minor: i64,
    /// Recorded in the intent's metadata for cross-referencing from the Stripe dashboard.
    pub order_id: String,
}

//--------------------------------------      StripeApi       --------------------------------------------------------
#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Opens a payment intent with a destination-account split and a declared application fee.
    pub async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntentResource, StripeApiError> {
        let form = [
            ("amount", params.amount_minor.to_string()),
            ("currency", params.currency.to_lowercase()),
            ("description", params.description),
            ("application_fee_amount", params.application_fee_minor.to_string()),
            ("transfer_data[destination]", params.destination_account),
            ("metadata[order_id]", params.order_id),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        let url = self.url("/payment_intents");
        trace!("💳️ POST {url}");
        let response = self.client.post(url).form(&form).send().await.map_err(|e| {
            if e.is_timeout() {
                StripeApiError::Timeout
            } else {
                StripeApiError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        if status.is_success() {
            let intent =
                response.json::<PaymentIntentResource>().await.map_err(|e| StripeApiError::Json(e.to_string()))?;
            debug!("💳️ Payment intent {} created", intent.id);
            Ok(intent)
        } else {
            let body = response.text().await.map_err(|e| StripeApiError::Transport(e.to_string()))?;
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| body.clone());
            warn!("💳️ Stripe rejected the payment intent ({status}): {message}");
            Err(StripeApiError::Api { status: status.as_u16(), message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}
