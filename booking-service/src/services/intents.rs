//! Payment intent issuance and confirmation.

use std::sync::Arc;

use crate::error::{CheckoutError, Result};
use crate::models::{is_processor_id, to_minor_units, EphemeralKey, PaymentIntent};
use crate::services::metrics;
use crate::services::processor::{NewPaymentIntent, PaymentProcessor};

/// Everything the payment sheet needs to show and complete a payment.
#[derive(Debug, Clone)]
pub struct IssuedIntent {
    pub payment_intent: PaymentIntent,
    pub ephemeral_key: EphemeralKey,
    pub customer_id: String,
}

/// Client request to confirm an intent with a chosen payment method.
#[derive(Debug, Clone)]
pub struct IntentConfirmation {
    pub payment_intent_id: String,
    pub payment_method_id: String,
    pub customer_id: String,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct IntentIssuer {
    processor: Arc<dyn PaymentProcessor>,
    currency: String,
}

impl IntentIssuer {
    pub fn new(processor: Arc<dyn PaymentProcessor>, currency: impl Into<String>) -> Self {
        Self {
            processor,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Create an intent for `amount` major units in the deployment currency,
    /// together with an ephemeral key for `customer_id`.
    pub async fn create_intent(&self, amount: i64, customer_id: &str) -> Result<IssuedIntent> {
        if amount <= 0 {
            return Err(CheckoutError::validation("amount must be positive"));
        }
        if customer_id.is_empty() {
            return Err(CheckoutError::validation("customer id is required"));
        }
        let amount_minor = to_minor_units(amount)
            .ok_or_else(|| CheckoutError::validation("amount is too large"))?;

        let ephemeral_key = self.processor.create_ephemeral_key(customer_id).await?;

        let payment_intent = self
            .processor
            .create_payment_intent(&NewPaymentIntent {
                amount: amount_minor,
                currency: self.currency.clone(),
                customer_id: customer_id.to_string(),
                automatic_payment_methods: true,
                allow_redirects: false,
            })
            .await?;

        metrics::record_intent(&self.currency, amount_minor);
        tracing::info!(
            customer_id,
            payment_intent_id = %payment_intent.id,
            amount_minor,
            "Payment intent issued"
        );

        Ok(IssuedIntent {
            payment_intent,
            ephemeral_key,
            customer_id: customer_id.to_string(),
        })
    }

    /// Confirm an intent with the payment method chosen in the sheet.
    ///
    /// The intent must belong to `customer_id` and `client_secret` must be the
    /// one issued with it. An intent that is already confirmed is returned
    /// as is.
    pub async fn confirm_intent(&self, request: &IntentConfirmation) -> Result<PaymentIntent> {
        if request.payment_intent_id.is_empty()
            || request.payment_method_id.is_empty()
            || request.customer_id.is_empty()
            || request.client_secret.is_empty()
        {
            return Err(CheckoutError::validation("Missing required fields."));
        }
        if !is_processor_id(&request.payment_intent_id) || !is_processor_id(&request.customer_id) {
            return Err(CheckoutError::validation("malformed payment intent or customer id"));
        }

        let intent = self
            .processor
            .retrieve_payment_intent(&request.payment_intent_id)
            .await?;

        if intent.client_secret.as_deref() != Some(request.client_secret.as_str())
            || intent.customer.as_deref() != Some(request.customer_id.as_str())
        {
            tracing::warn!(
                payment_intent_id = %request.payment_intent_id,
                customer_id = %request.customer_id,
                "Confirmation does not match payment intent"
            );
            return Err(CheckoutError::validation(
                "payment intent does not belong to this checkout",
            ));
        }

        if intent.status.is_confirmed() {
            tracing::info!(payment_intent_id = %intent.id, "Payment intent already confirmed");
            return Ok(intent);
        }

        let confirmed = self
            .processor
            .confirm_payment_intent(&request.payment_intent_id, &request.payment_method_id)
            .await?;

        // Not collected: no secret goes back to the client.
        if !confirmed.status.is_confirmed() {
            tracing::warn!(
                payment_intent_id = %confirmed.id,
                status = confirmed.status.as_str(),
                "Payment intent not completed after confirmation"
            );
            return Err(CheckoutError::PaymentIncomplete {
                payment_intent_id: confirmed.id,
                status: confirmed.status,
            });
        }

        Ok(confirmed)
    }

    /// Check that `intent_id` is confirmed for exactly `amount` major units in
    /// the deployment currency.
    pub async fn verify_confirmed(&self, intent_id: &str, amount: i64) -> Result<PaymentIntent> {
        if intent_id.is_empty() {
            return Err(CheckoutError::validation("payment intent id is required"));
        }
        if !is_processor_id(intent_id) {
            return Err(CheckoutError::validation("malformed payment intent id"));
        }

        let intent = self.processor.retrieve_payment_intent(intent_id).await?;

        if !intent.status.is_confirmed() {
            return Err(CheckoutError::validation(format!(
                "payment intent {} is not confirmed",
                intent.id
            )));
        }
        if Some(intent.amount) != to_minor_units(amount)
            || !intent.currency.eq_ignore_ascii_case(&self.currency)
        {
            return Err(CheckoutError::validation(
                "booking amount does not match payment",
            ));
        }

        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentIntentStatus;
    use crate::services::testing::FakeProcessor;

    fn issuer(processor: Arc<FakeProcessor>) -> IntentIssuer {
        IntentIssuer::new(processor, "bgn")
    }

    #[tokio::test]
    async fn converts_amount_to_minor_units() {
        let processor = Arc::new(FakeProcessor::default());
        let issued = issuer(processor.clone())
            .create_intent(100, "cus_1")
            .await
            .unwrap();

        assert_eq!(issued.payment_intent.amount, 10_000);
        assert_eq!(issued.payment_intent.currency, "bgn");
        assert_eq!(issued.customer_id, "cus_1");

        let params = processor.last_intent_params().unwrap();
        assert!(params.automatic_payment_methods);
        assert!(!params.allow_redirects);
    }

    #[tokio::test]
    async fn issues_ephemeral_key_for_customer() {
        let processor = Arc::new(FakeProcessor::default());
        issuer(processor.clone())
            .create_intent(50, "cus_9")
            .await
            .unwrap();

        assert!(processor.calls().contains(&"ephemeral_key:cus_9".to_string()));
    }

    #[tokio::test]
    async fn never_creates_intent_for_non_positive_amount() {
        let processor = Arc::new(FakeProcessor::default());
        let issuer = issuer(processor.clone());

        for amount in [0, -5] {
            let err = issuer.create_intent(amount, "cus_1").await.unwrap_err();
            assert!(matches!(err, CheckoutError::Validation(_)));
        }
        assert!(processor.calls().is_empty());
    }

    #[tokio::test]
    async fn never_creates_intent_without_customer() {
        let processor = Arc::new(FakeProcessor::default());
        let err = issuer(processor.clone())
            .create_intent(100, "")
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(processor.calls().is_empty());
    }

    #[tokio::test]
    async fn overflowing_amount_is_rejected() {
        let processor = Arc::new(FakeProcessor::default());
        let err = issuer(processor)
            .create_intent(i64::MAX, "cus_1")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[tokio::test]
    async fn confirms_matching_intent() {
        let processor = Arc::new(FakeProcessor::default());
        let issuer = issuer(processor.clone());
        let issued = issuer.create_intent(100, "cus_1").await.unwrap();

        let confirmed = issuer
            .confirm_intent(&IntentConfirmation {
                payment_intent_id: issued.payment_intent.id.clone(),
                payment_method_id: "pm_card_visa".to_string(),
                customer_id: "cus_1".to_string(),
                client_secret: issued.payment_intent.client_secret.clone().unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(confirmed.status, PaymentIntentStatus::Succeeded);
        assert!(processor
            .calls()
            .contains(&format!("confirm_intent:{}:pm_card_visa", issued.payment_intent.id)));
    }

    #[tokio::test]
    async fn refuses_confirmation_with_foreign_secret() {
        let processor = Arc::new(FakeProcessor::default());
        let issuer = issuer(processor.clone());
        let issued = issuer.create_intent(100, "cus_1").await.unwrap();

        let err = issuer
            .confirm_intent(&IntentConfirmation {
                payment_intent_id: issued.payment_intent.id.clone(),
                payment_method_id: "pm_card_visa".to_string(),
                customer_id: "cus_1".to_string(),
                client_secret: "pi_other_secret".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(!processor.calls().iter().any(|c| c.starts_with("confirm_intent")));
    }

    #[tokio::test]
    async fn verify_rejects_unconfirmed_intent() {
        let processor = Arc::new(FakeProcessor::default());
        let issuer = issuer(processor.clone());
        let issued = issuer.create_intent(100, "cus_1").await.unwrap();

        let err = issuer
            .verify_confirmed(&issued.payment_intent.id, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));

        processor.set_intent_status(&issued.payment_intent.id, PaymentIntentStatus::Succeeded);
        assert!(issuer
            .verify_confirmed(&issued.payment_intent.id, 100)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn verify_rejects_amount_mismatch() {
        let processor = Arc::new(FakeProcessor::default());
        let issuer = issuer(processor.clone());
        let issued = issuer.create_intent(100, "cus_1").await.unwrap();
        processor.set_intent_status(&issued.payment_intent.id, PaymentIntentStatus::Succeeded);

        let err = issuer
            .verify_confirmed(&issued.payment_intent.id, 99)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[tokio::test]
    async fn incomplete_confirmation_is_not_a_payment() {
        let processor = Arc::new(FakeProcessor::confirming_to(PaymentIntentStatus::RequiresAction));
        let issuer = issuer(processor.clone());
        let issued = issuer.create_intent(100, "cus_1").await.unwrap();

        let err = issuer
            .confirm_intent(&IntentConfirmation {
                payment_intent_id: issued.payment_intent.id.clone(),
                payment_method_id: "pm_card_threeDSecure2Required".to_string(),
                customer_id: "cus_1".to_string(),
                client_secret: issued.payment_intent.client_secret.clone().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::PaymentIncomplete {
                status: PaymentIntentStatus::RequiresAction,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn malformed_ids_never_reach_the_processor() {
        let processor = Arc::new(FakeProcessor::default());
        let issuer = issuer(processor.clone());

        let err = issuer
            .confirm_intent(&IntentConfirmation {
                payment_intent_id: "pi_1/../../customers".to_string(),
                payment_method_id: "pm_card_visa".to_string(),
                customer_id: "cus_1".to_string(),
                client_secret: "pi_1_secret".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));

        let err = issuer
            .verify_confirmed("pi_1/../../customers", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));

        assert!(processor.calls().is_empty());
    }
}
