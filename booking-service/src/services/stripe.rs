//! Stripe REST client.
//!
//! Covers the handful of calls checkout needs: customer lookup and creation,
//! ephemeral keys for the mobile payment sheet, and payment intent
//! creation, retrieval and confirmation. Requests are form-encoded and
//! authenticated with the secret key as a bearer token.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::StripeSettings;
use crate::models::{is_processor_id, Customer, EphemeralKey, PaymentIntent};
use crate::services::processor::{NewPaymentIntent, PaymentProcessor, ProcessorError};

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeSettings,
}

/// Stripe list envelope.
#[derive(Debug, Deserialize)]
struct List<T> {
    data: Vec<T>,
}

/// Stripe API error response.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: StripeSettings) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if the secret key is set.
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    /// `payment_intents/{id}{suffix}`, refusing ids that could rewrite the path.
    fn intent_url(&self, intent_id: &str, suffix: &str) -> Result<String, ProcessorError> {
        if !is_processor_id(intent_id) {
            return Err(ProcessorError::InvalidId(intent_id.to_string()));
        }
        Ok(self.url(&format!("payment_intents/{}{}", intent_id, suffix)))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, ProcessorError> {
        if !self.is_configured() {
            return Err(ProcessorError::NotConfigured);
        }

        let response = request
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, operation, "Stripe response");

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let detail = serde_json::from_str::<StripeErrorBody>(&body)
            .map(|parsed| parsed.error)
            .unwrap_or(StripeErrorDetail {
                code: None,
                kind: None,
                message: Some(body.clone()),
            });
        let code = detail
            .code
            .or(detail.kind)
            .unwrap_or_else(|| "unknown".to_string());
        let message = detail.message.unwrap_or_default();

        tracing::error!(
            operation,
            status = status.as_u16(),
            code = %code,
            message = %message,
            "Stripe request failed"
        );

        Err(ProcessorError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, ProcessorError> {
        let request = self
            .client
            .get(self.url("customers"))
            .query(&[("email", email), ("limit", "1")]);

        let customers: List<Customer> = self.send(request, "list_customers").await?;
        Ok(customers.data.into_iter().next())
    }

    async fn create_customer(&self, name: &str, email: &str) -> Result<Customer, ProcessorError> {
        let request = self
            .client
            .post(self.url("customers"))
            .form(&[("name", name), ("email", email)]);

        let customer: Customer = self.send(request, "create_customer").await?;
        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer)
    }

    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
    ) -> Result<EphemeralKey, ProcessorError> {
        let request = self
            .client
            .post(self.url("ephemeral_keys"))
            .header("Stripe-Version", self.config.api_version.as_str())
            .form(&[("customer", customer_id)]);

        self.send(request, "create_ephemeral_key").await
    }

    async fn create_payment_intent(
        &self,
        params: &NewPaymentIntent,
    ) -> Result<PaymentIntent, ProcessorError> {
        let allow_redirects = if params.allow_redirects {
            "always"
        } else {
            "never"
        };
        let form = [
            ("amount", params.amount.to_string()),
            ("currency", params.currency.clone()),
            ("customer", params.customer_id.clone()),
            (
                "automatic_payment_methods[enabled]",
                params.automatic_payment_methods.to_string(),
            ),
            (
                "automatic_payment_methods[allow_redirects]",
                allow_redirects.to_string(),
            ),
        ];

        let request = self.client.post(self.url("payment_intents")).form(&form);

        let intent: PaymentIntent = self.send(request, "create_payment_intent").await?;
        tracing::info!(
            payment_intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "Stripe payment intent created"
        );
        Ok(intent)
    }

    async fn retrieve_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        let request = self.client.get(self.intent_url(intent_id, "")?);

        self.send(request, "retrieve_payment_intent").await
    }

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        let request = self
            .client
            .post(self.intent_url(intent_id, "/confirm")?)
            .form(&[("payment_method", payment_method_id)]);

        let intent: PaymentIntent = self.send(request, "confirm_payment_intent").await?;
        tracing::info!(
            payment_intent_id = %intent.id,
            status = ?intent.status,
            "Stripe payment intent confirmed"
        );
        Ok(intent)
    }
}
