//! Seam between the checkout services and the payment processor.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Customer, EphemeralKey, PaymentIntent};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("payment processor credentials not configured")]
    NotConfigured,

    #[error("malformed object id: {0:?}")]
    InvalidId(String),

    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Parameters for a new payment intent. `amount` is already in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub customer_id: String,
    /// Let the processor choose payment methods automatically.
    pub automatic_payment_methods: bool,
    /// Whether redirect-based methods may be offered. The mobile client cannot
    /// follow redirects.
    pub allow_redirects: bool,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// First customer registered under `email`, if any.
    async fn find_customer_by_email(&self, email: &str)
        -> Result<Option<Customer>, ProcessorError>;

    async fn create_customer(&self, name: &str, email: &str) -> Result<Customer, ProcessorError>;

    async fn create_ephemeral_key(&self, customer_id: &str)
        -> Result<EphemeralKey, ProcessorError>;

    async fn create_payment_intent(
        &self,
        params: &NewPaymentIntent,
    ) -> Result<PaymentIntent, ProcessorError>;

    async fn retrieve_payment_intent(&self, intent_id: &str)
        -> Result<PaymentIntent, ProcessorError>;

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, ProcessorError>;
}
