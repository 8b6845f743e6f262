//! Client-side checkout: present the sheet, issue and confirm the intent on
//! the backend, then commit the booking.
//!
//! The flow is an explicit state machine. A booking can only be committed
//! from [`CheckoutState::Committing`], which holds a [`ConfirmedPayment`].
//! That value is only built from a non-empty confirmation secret returned by
//! `POST /checkout/pay`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::checkout::backend::{BackendError, CheckoutBackend};
use crate::checkout::sheet::{PaymentMethod, PaymentSheet, SheetCompletion, SheetConfig, SheetEvent};
use crate::dtos::{BookingResponse, CreatePaymentRequest, CreatePaymentResponse, PayRequest};
use crate::models::{to_minor_units, DateRange, Property};

/// Proof that the processor confirmed a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPayment {
    payment_intent_id: String,
    customer_id: String,
    client_secret: String,
}

impl ConfirmedPayment {
    /// `None` unless the confirmation carried a non-empty secret.
    pub(crate) fn from_confirmation(
        payment_intent_id: String,
        customer_id: String,
        client_secret: Option<String>,
    ) -> Option<Self> {
        let client_secret = client_secret.filter(|s| !s.is_empty())?;
        Some(Self {
            payment_intent_id,
            customer_id,
            client_secret,
        })
    }

    pub fn payment_intent_id(&self) -> &str {
        &self.payment_intent_id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

/// Booking fields the backend needs besides the payment itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub user_id: String,
    pub property: Property,
    /// Major units.
    pub amount: i64,
    pub dates: DateRange,
}

/// The signed-in user paying for the stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub user: CheckoutUser,
    pub property: Property,
    pub dates: DateRange,
}

impl CheckoutRequest {
    /// Validate the user's selection. Both dates must be picked, the range
    /// must be valid relative to `today`, and the price must be positive.
    pub fn new(
        user: CheckoutUser,
        property: Property,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        today: NaiveDate,
    ) -> Result<Self, CheckoutFailure> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(CheckoutFailure::InvalidRequest(
                "Please select a start and an end date".to_string(),
            ));
        };

        if property.price <= 0 || to_minor_units(property.price).is_none() {
            return Err(CheckoutFailure::InvalidRequest(format!(
                "Invalid price for property {}",
                property.id
            )));
        }

        let dates = DateRange::new(start, end, today)
            .map_err(|e| CheckoutFailure::InvalidRequest(e.to_string()))?;

        Ok(Self {
            user,
            property,
            dates,
        })
    }
}

/// Display settings for the payment sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub merchant_display_name: String,
    pub currency: String,
    pub return_url: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            merchant_display_name: "RealEstate, Inc.".to_string(),
            currency: "bgn".to_string(),
            return_url: "realestate://".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    Booked(BookingResponse),
    Canceled,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutFailure {
    #[error("{0}")]
    InvalidRequest(String),

    /// Nothing was charged.
    #[error("payment failed ({code}): {message}")]
    Payment { code: String, message: String },

    /// The charge went through but no booking exists for it.
    #[error("payment {payment_intent_id} succeeded but the booking was not saved: {message}")]
    BookingAfterPayment {
        payment_intent_id: String,
        message: String,
    },
}

impl CheckoutFailure {
    pub fn code(&self) -> &str {
        match self {
            CheckoutFailure::InvalidRequest(_) => "invalid_request",
            CheckoutFailure::Payment { code, .. } => code,
            CheckoutFailure::BookingAfterPayment { .. } => "booking_failed",
        }
    }

    fn payment(code: impl Into<String>, message: impl Into<String>) -> Self {
        CheckoutFailure::Payment {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<BackendError> for CheckoutFailure {
    fn from(err: BackendError) -> Self {
        CheckoutFailure::payment(err.code(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    Init,
    /// Payment method chosen; customer and intent are being set up.
    Resolving { payment_method: PaymentMethod },
    /// Intent issued; waiting for the processor to confirm it.
    Confirming {
        payment_method: PaymentMethod,
        issued: CreatePaymentResponse,
    },
    Committing { payment: ConfirmedPayment },
    Done {
        booking: BookingResponse,
        payment: ConfirmedPayment,
    },
    Failed(CheckoutFailure),
    Canceled,
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Init => "init",
            CheckoutState::Resolving { .. } => "resolving",
            CheckoutState::Confirming { .. } => "confirming",
            CheckoutState::Committing { .. } => "committing",
            CheckoutState::Done { .. } => "done",
            CheckoutState::Failed(_) => "failed",
            CheckoutState::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Done { .. } | CheckoutState::Failed(_) | CheckoutState::Canceled
        )
    }
}

pub struct CheckoutFlow {
    backend: Arc<dyn CheckoutBackend>,
    sheet: Arc<dyn PaymentSheet>,
    settings: CheckoutSettings,
}

impl CheckoutFlow {
    pub fn new(
        backend: Arc<dyn CheckoutBackend>,
        sheet: Arc<dyn PaymentSheet>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            backend,
            sheet,
            settings,
        }
    }

    /// Drive one checkout to a terminal state.
    pub async fn run(&self, request: &CheckoutRequest) -> Result<CheckoutOutcome, CheckoutFailure> {
        let mut state = CheckoutState::Init;
        // Set once the user picked a payment method; the sheet then waits
        // for `complete`.
        let mut sheet_open = false;

        loop {
            tracing::debug!(state = state.name(), user_id = %request.user.id, "Checkout step");

            state = match state {
                CheckoutState::Done { booking, payment } => {
                    tracing::info!(
                        booking_id = %booking.id,
                        payment_intent_id = %payment.payment_intent_id(),
                        "Checkout completed"
                    );
                    self.sheet
                        .complete(SheetCompletion::Succeeded {
                            client_secret: payment.client_secret,
                        })
                        .await;
                    return Ok(CheckoutOutcome::Booked(booking));
                }
                CheckoutState::Failed(failure) => {
                    tracing::warn!(code = failure.code(), error = %failure, "Checkout failed");
                    if sheet_open {
                        self.sheet
                            .complete(SheetCompletion::Failed {
                                code: failure.code().to_string(),
                                message: failure.to_string(),
                            })
                            .await;
                    }
                    return Err(failure);
                }
                CheckoutState::Canceled => {
                    tracing::info!(user_id = %request.user.id, "Checkout canceled");
                    return Ok(CheckoutOutcome::Canceled);
                }
                state => self.step(state, request).await,
            };

            if matches!(state, CheckoutState::Resolving { .. }) {
                sheet_open = true;
            }
        }
    }

    async fn step(&self, state: CheckoutState, request: &CheckoutRequest) -> CheckoutState {
        match state {
            CheckoutState::Init => match self.sheet_config(request) {
                Ok(config) => match self.sheet.present(&config).await {
                    SheetEvent::PaymentMethodSelected(payment_method) => {
                        CheckoutState::Resolving { payment_method }
                    }
                    SheetEvent::Canceled => CheckoutState::Canceled,
                    SheetEvent::Failed { code, message } => {
                        CheckoutState::Failed(CheckoutFailure::payment(code, message))
                    }
                },
                Err(failure) => CheckoutState::Failed(failure),
            },

            CheckoutState::Resolving { payment_method } => {
                let create = CreatePaymentRequest {
                    name: request.user.name.clone(),
                    email: request.user.email.clone(),
                    amount: request.property.price,
                };

                match self.backend.create_payment(&create).await {
                    Ok(issued) if has_client_secret(&issued) => CheckoutState::Confirming {
                        payment_method,
                        issued,
                    },
                    Ok(issued) => CheckoutState::Failed(CheckoutFailure::payment(
                        "missing_client_secret",
                        format!("payment intent {} has no client secret", issued.payment_intent.id),
                    )),
                    Err(e) => CheckoutState::Failed(e.into()),
                }
            }

            CheckoutState::Confirming {
                payment_method,
                issued,
            } => {
                let pay = PayRequest {
                    payment_method_id: payment_method.id,
                    payment_intent_id: issued.payment_intent.id,
                    customer_id: issued.customer,
                    client_secret: issued.payment_intent.client_secret.unwrap_or_default(),
                };

                match self.backend.pay(&pay).await {
                    Ok(response) => match ConfirmedPayment::from_confirmation(
                        pay.payment_intent_id.clone(),
                        pay.customer_id,
                        response.result.client_secret,
                    ) {
                        Some(payment) => CheckoutState::Committing { payment },
                        None => CheckoutState::Failed(CheckoutFailure::payment(
                            "missing_confirmation_secret",
                            format!(
                                "payment intent {} was not confirmed",
                                pay.payment_intent_id
                            ),
                        )),
                    },
                    Err(e) => CheckoutState::Failed(e.into()),
                }
            }

            CheckoutState::Committing { payment } => {
                let draft = BookingDraft {
                    user_id: request.user.id.clone(),
                    property: request.property.clone(),
                    amount: request.property.price,
                    dates: request.dates,
                };

                match self.backend.commit_booking(&payment, &draft).await {
                    Ok(booking) => CheckoutState::Done { booking, payment },
                    Err(e) => {
                        tracing::error!(
                            payment_intent_id = %payment.payment_intent_id(),
                            error = %e,
                            "Booking commit failed after payment"
                        );
                        CheckoutState::Failed(CheckoutFailure::BookingAfterPayment {
                            payment_intent_id: payment.payment_intent_id,
                            message: e.to_string(),
                        })
                    }
                }
            }

            terminal @ (CheckoutState::Done { .. }
            | CheckoutState::Failed(_)
            | CheckoutState::Canceled) => terminal,
        }
    }

    fn sheet_config(&self, request: &CheckoutRequest) -> Result<SheetConfig, CheckoutFailure> {
        let amount = to_minor_units(request.property.price)
            .filter(|amount| *amount > 0)
            .ok_or_else(|| {
                CheckoutFailure::InvalidRequest(format!(
                    "Invalid price for property {}",
                    request.property.id
                ))
            })?;

        Ok(SheetConfig {
            merchant_display_name: self.settings.merchant_display_name.clone(),
            amount,
            currency_code: self.settings.currency.clone(),
            return_url: self.settings.return_url.clone(),
        })
    }
}

fn has_client_secret(issued: &CreatePaymentResponse) -> bool {
    issued
        .payment_intent
        .client_secret
        .as_deref()
        .is_some_and(|s| !s.is_empty())
}
