//! Customer resolution: find the processor customer for an email, or create one.

use std::sync::Arc;

use crate::error::{CheckoutError, Result};
use crate::services::processor::PaymentProcessor;

#[derive(Clone)]
pub struct CustomerResolver {
    processor: Arc<dyn PaymentProcessor>,
}

impl CustomerResolver {
    pub fn new(processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { processor }
    }

    /// Return the id of the customer registered under `email`, creating the
    /// customer when none exists. With several matches the first one wins.
    ///
    /// Creation is not idempotent: a retry after a failed create can leave a
    /// duplicate upstream. The lookup runs first on every call, so a
    /// successful create is reused by the next attempt.
    pub async fn resolve_customer(&self, email: &str, name: &str) -> Result<String> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() || name.is_empty() {
            return Err(CheckoutError::validation("email and name are required"));
        }

        if let Some(customer) = self.processor.find_customer_by_email(email).await? {
            tracing::debug!(customer_id = %customer.id, "Reusing existing customer");
            return Ok(customer.id);
        }

        let customer = self.processor.create_customer(name, email).await?;
        tracing::info!(customer_id = %customer.id, "Created customer");
        Ok(customer.id)
    }
}
