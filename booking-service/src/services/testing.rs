//! In-memory processor used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{Customer, EphemeralKey, PaymentIntent, PaymentIntentStatus};
use crate::services::processor::{NewPaymentIntent, PaymentProcessor, ProcessorError};

#[derive(Default)]
struct State {
    customers: Vec<Customer>,
    intents: HashMap<String, PaymentIntent>,
    last_intent_params: Option<NewPaymentIntent>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeProcessor {
    state: Mutex<State>,
    fail: bool,
    confirm_status: Option<PaymentIntentStatus>,
}

impl FakeProcessor {
    /// Every call fails with an API error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Confirmation leaves intents in `status` instead of `succeeded`.
    pub fn confirming_to(status: PaymentIntentStatus) -> Self {
        Self {
            confirm_status: Some(status),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn customer_count(&self) -> usize {
        self.state.lock().unwrap().customers.len()
    }

    pub fn last_intent_params(&self) -> Option<NewPaymentIntent> {
        self.state.lock().unwrap().last_intent_params.clone()
    }

    pub fn set_intent_status(&self, id: &str, status: PaymentIntentStatus) {
        if let Some(intent) = self.state.lock().unwrap().intents.get_mut(id) {
            intent.status = status;
        }
    }

    fn record(&self, call: String) -> Result<(), ProcessorError> {
        self.state.lock().unwrap().calls.push(call);
        if self.fail {
            return Err(ProcessorError::Api {
                status: 500,
                code: "api_error".to_string(),
                message: "processor unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, ProcessorError> {
        self.record(format!("find_customer:{email}"))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .customers
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_customer(&self, name: &str, email: &str) -> Result<Customer, ProcessorError> {
        self.record(format!("create_customer:{email}"))?;
        let mut state = self.state.lock().unwrap();
        let customer = Customer {
            id: format!("cus_{}", state.customers.len() + 1),
            email: Some(email.to_string()),
            name: Some(name.to_string()),
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
    ) -> Result<EphemeralKey, ProcessorError> {
        self.record(format!("ephemeral_key:{customer_id}"))?;
        Ok(EphemeralKey {
            id: format!("ephkey_{customer_id}"),
            secret: format!("ek_{customer_id}"),
            created: 1_760_600_000,
            expires: 1_760_603_600,
        })
    }

    async fn create_payment_intent(
        &self,
        params: &NewPaymentIntent,
    ) -> Result<PaymentIntent, ProcessorError> {
        self.record(format!("create_intent:{}", params.amount))?;
        let mut state = self.state.lock().unwrap();
        let id = format!("pi_{}", state.intents.len() + 1);
        let intent = PaymentIntent {
            client_secret: Some(format!("{id}_secret")),
            id: id.clone(),
            amount: params.amount,
            currency: params.currency.clone(),
            customer: Some(params.customer_id.clone()),
            status: PaymentIntentStatus::RequiresPaymentMethod,
        };
        state.intents.insert(id, intent.clone());
        state.last_intent_params = Some(params.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        self.record(format!("retrieve_intent:{intent_id}"))?;
        self.state
            .lock()
            .unwrap()
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| ProcessorError::Api {
                status: 404,
                code: "resource_missing".to_string(),
                message: format!("No such payment_intent: '{intent_id}'"),
            })
    }

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        self.record(format!("confirm_intent:{intent_id}:{payment_method_id}"))?;
        let mut state = self.state.lock().unwrap();
        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| ProcessorError::Api {
                status: 404,
                code: "resource_missing".to_string(),
                message: format!("No such payment_intent: '{intent_id}'"),
            })?;
        intent.status = self
            .confirm_status
            .unwrap_or(PaymentIntentStatus::Succeeded);
        Ok(intent.clone())
    }
}
