//! Checkout endpoints: issue a payment intent for the sheet, then confirm it.

use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{CreatePaymentPayload, CreatePaymentResponse, PayRequest, PayResponse, PayResult},
    services::IntentConfirmation,
    AppState,
};

const MISSING_FIELDS: &str = "Missing required fields.";

/// Resolve the customer for `email` and issue an intent for `amount`.
///
/// Responds `400 {"error": "Missing required fields."}` when name, email or
/// amount is absent, and `502` with the processor's error when the processor
/// call fails.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<Json<CreatePaymentResponse>, AppError> {
    let (name, email, amount) = payload
        .required_fields()
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!(MISSING_FIELDS)))?;

    tracing::info!(amount, "Creating checkout payment");

    let customer_id = state.customers.resolve_customer(email, name).await?;
    let issued = state.intents.create_intent(amount, &customer_id).await?;

    Ok(Json(CreatePaymentResponse {
        payment_intent: issued.payment_intent,
        ephemeral_key: issued.ephemeral_key,
        customer: issued.customer_id,
    }))
}

/// Confirm an issued intent with the payment method picked in the sheet.
///
/// The secret is only returned once the processor reports the money as
/// collected; an intent left in `requires_action` or similar yields `402`.
pub async fn pay(
    State(state): State<AppState>,
    Json(payload): Json<PayRequest>,
) -> Result<Json<PayResponse>, AppError> {
    if payload.payment_method_id.is_empty()
        || payload.payment_intent_id.is_empty()
        || payload.customer_id.is_empty()
        || payload.client_secret.is_empty()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(MISSING_FIELDS)));
    }

    tracing::info!(
        payment_intent_id = %payload.payment_intent_id,
        customer_id = %payload.customer_id,
        "Confirming checkout payment"
    );

    let confirmed = state
        .intents
        .confirm_intent(&IntentConfirmation {
            payment_intent_id: payload.payment_intent_id,
            payment_method_id: payload.payment_method_id,
            customer_id: payload.customer_id,
            client_secret: payload.client_secret,
        })
        .await?;

    Ok(Json(PayResponse {
        result: PayResult {
            client_secret: confirmed.client_secret,
        },
    }))
}
