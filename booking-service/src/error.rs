//! Domain errors for the checkout operations and their HTTP mapping.

use service_core::error::AppError;
use thiserror::Error;

use crate::models::{DateRangeError, PaymentIntentStatus};
use crate::services::processor::ProcessorError;

pub type Result<T> = std::result::Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Missing or malformed input; no upstream call was made.
    #[error("{0}")]
    Validation(String),

    /// Confirmation went through but the processor did not collect the money.
    #[error("payment intent {payment_intent_id} was not completed (status {})", status.as_str())]
    PaymentIncomplete {
        payment_intent_id: String,
        status: PaymentIntentStatus,
    },

    /// The payment processor rejected the call or could not be reached.
    #[error("payment processor error: {0}")]
    Upstream(#[from] ProcessorError),

    /// The booking store rejected the write.
    #[error("booking store error: {0}")]
    Persistence(anyhow::Error),
}

impl CheckoutError {
    pub fn validation(message: impl Into<String>) -> Self {
        CheckoutError::Validation(message.into())
    }
}

impl From<DateRangeError> for CheckoutError {
    fn from(err: DateRangeError) -> Self {
        CheckoutError::Validation(err.to_string())
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(message) => AppError::BadRequest(anyhow::anyhow!(message)),
            err @ CheckoutError::PaymentIncomplete { .. } => {
                AppError::PaymentRequired(err.to_string())
            }
            CheckoutError::Upstream(err) => AppError::BadGateway(err.to_string()),
            CheckoutError::Persistence(err) => AppError::DatabaseError(err),
        }
    }
}
