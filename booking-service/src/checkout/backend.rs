//! HTTP client for the booking-service checkout endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkout::flow::{BookingDraft, ConfirmedPayment};
use crate::dtos::{
    BookingResponse, CreateBookingRequest, CreatePaymentRequest, CreatePaymentResponse,
    PayRequest, PayResponse,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl BackendError {
    /// Short machine-readable code for alerts.
    pub fn code(&self) -> String {
        match self {
            BackendError::Transport(_) => "network_error".to_string(),
            BackendError::Rejected { status, .. } => format!("http_{}", status),
        }
    }
}

/// Server side of the checkout, reached from the client.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    /// Resolve the customer and issue an intent (`POST /checkout/create`).
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, BackendError>;

    /// Confirm the intent with the chosen payment method (`POST /checkout/pay`).
    async fn pay(&self, request: &PayRequest) -> Result<PayResponse, BackendError>;

    /// Persist the booking. Only callable with proof of a confirmed payment.
    async fn commit_booking(
        &self,
        payment: &ConfirmedPayment,
        booking: &BookingDraft,
    ) -> Result<BookingResponse, BackendError>;
}

/// Configuration for the backend client.
#[derive(Clone, Debug)]
pub struct BackendClientConfig {
    /// Base URL of booking-service (e.g. "http://booking-service:3010").
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for BackendClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3010".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

impl BackendClient {
    pub fn new(config: BackendClientConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn connect(endpoint: &str) -> Result<Self, BackendError> {
        Self::new(BackendClientConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(ErrorBody {
                error,
                details: Some(details),
            }) => format!("{}: {}", error, details),
            Ok(ErrorBody { error, .. }) => error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        };

        tracing::warn!(path, status = status.as_u16(), message = %message, "Backend rejected request");

        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CheckoutBackend for BackendClient {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, BackendError> {
        self.post_json("/checkout/create", request).await
    }

    async fn pay(&self, request: &PayRequest) -> Result<PayResponse, BackendError> {
        self.post_json("/checkout/pay", request).await
    }

    async fn commit_booking(
        &self,
        payment: &ConfirmedPayment,
        booking: &BookingDraft,
    ) -> Result<BookingResponse, BackendError> {
        let request = CreateBookingRequest {
            user_id: booking.user_id.clone(),
            property: booking.property.clone(),
            amount: booking.amount,
            start_date: booking.dates.start(),
            end_date: booking.dates.end(),
            payment_intent_id: payment.payment_intent_id().to_string(),
        };

        self.post_json("/bookings", &request).await
    }
}
