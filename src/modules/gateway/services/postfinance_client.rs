use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::PostFinanceConfig;
use crate::core::{AppError, Currency, Result};
use crate::modules::gateway::models::ChargeOutcome;
use crate::modules::gateway::services::PaymentGateway;

type HmacSha256 = Hmac<Sha256>;

/// Client for the PostFinance Checkout REST API.
///
/// Requests are authenticated with a per-request JWT signed HMAC-SHA256 with
/// the base64-decoded API secret, per the PostFinance specification. Credentials
/// come in as an explicit config value rather than ambient state.
pub struct PostFinanceClient {
    config: PostFinanceConfig,
    http: ClientWithMiddleware,
}

impl PostFinanceClient {
    pub fn new(config: PostFinanceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // Bounded retry of transient network errors; business-level declines
        // are not retried here, that is the grace controller's job.
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
        let http = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { config, http })
    }

    /// Build the JWT for one request. The token signs the method and path so
    /// it cannot be replayed against a different endpoint.
    fn build_jwt(&self, method: &str, path: &str) -> Result<String> {
        let secret = STANDARD.decode(&self.config.api_secret).map_err(|_| {
            AppError::Configuration("POSTFINANCE_API_SECRET is not valid base64".to_string())
        })?;

        let header = json!({ "alg": "HS256", "typ": "JWT", "ver": 1 });
        let payload = json!({
            "sub": self.config.user_id,
            "iat": chrono::Utc::now().timestamp(),
            "requestPath": path,
            "requestMethod": method,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?),
        );

        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| AppError::internal(format!("HMAC key error: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    async fn post(&self, path: &str, query: &[(&str, String)], body: Value) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url, path);
        let jwt_path = url
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, p)| format!("/{}", p))
            .unwrap_or_else(|| path.to_string());
        let token = self.build_jwt("POST", &jwt_path)?;

        let response = self
            .http
            .post(&url)
            .query(query)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        debug!(path = path, status = %status, "PostFinance API request");

        if !status.is_success() {
            let detail: Value = response.json().await.unwrap_or(Value::Null);
            let message = detail
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no detail");
            error!(path = path, status = %status, message = message, "PostFinance API error");
            return Err(AppError::gateway(format!(
                "API request failed with status {}: {}",
                status, message
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::gateway(format!("Invalid JSON response: {}", e)))
    }

    fn space_query(&self) -> Vec<(&'static str, String)> {
        vec![("spaceId", self.config.space_id.to_string())]
    }
}

#[async_trait]
impl PaymentGateway for PostFinanceClient {
    async fn charge_token(
        &self,
        token_reference: &str,
        amount: Decimal,
        currency: Currency,
        merchant_reference: &str,
    ) -> Result<ChargeOutcome> {
        // Create a transaction bound to the saved token, then process it
        // without user interaction. No tokenization mode is requested, so the
        // existing token is reused as-is.
        let body = json!({
            "currency": currency.to_string(),
            "token": token_reference,
            "merchantReference": merchant_reference,
            "autoConfirmationEnabled": true,
            "lineItems": [{
                "uniqueId": merchant_reference,
                "name": "Installment payment",
                "type": "FEE",
                "quantity": 1,
                "amountIncludingTax": amount,
            }],
        });

        let created = self
            .post("/transaction/create", &self.space_query(), body)
            .await?;
        let transaction_id = created
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::gateway("Transaction create response missing id"))?;

        let mut query = self.space_query();
        query.push(("id", transaction_id.to_string()));
        let processed = self
            .post(
                "/transaction/processWithoutUserInteraction",
                &query,
                Value::Null,
            )
            .await?;

        let outcome: ChargeOutcome = serde_json::from_value(processed)?;
        Ok(outcome)
    }

    async fn read_transaction(&self, transaction_id: i64) -> Result<ChargeOutcome> {
        let mut query = self.space_query();
        query.push(("id", transaction_id.to_string()));

        let value = self
            .post("/transaction/read", &query, Value::Null)
            .await?;

        let outcome: ChargeOutcome = serde_json::from_value(value)?;
        Ok(outcome)
    }
}

/// Timeouts and connection failures are transient: the charge may or may not
/// have happened remotely, so the caller records a failure and lets the retry
/// cycle (plus per-attempt idempotency keys) sort it out.
fn map_request_error(err: reqwest_middleware::Error) -> AppError {
    match err {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            AppError::transient(e.to_string())
        }
        reqwest_middleware::Error::Reqwest(e) => AppError::HttpClient(e),
        reqwest_middleware::Error::Middleware(e) => AppError::transient(e.to_string()),
    }
}
