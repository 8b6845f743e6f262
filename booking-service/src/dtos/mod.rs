//! Wire types shared by the HTTP handlers and the checkout client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::{Booking, EphemeralKey, PaymentIntent, Property};

/// Body of `POST /checkout/create` as sent by the checkout client.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub name: String,
    pub email: String,
    /// Major units.
    pub amount: i64,
}

/// Lenient server-side view of `POST /checkout/create`: any field may be
/// absent, and `amount` may arrive as a number or a numeric string.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePaymentPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
}

impl CreatePaymentPayload {
    /// `(name, email, amount)` when every field is present and non-empty.
    pub fn required_fields(&self) -> Option<(&str, &str, i64)> {
        let name = self.name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let email = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let amount = self.amount.as_ref().and_then(parse_amount)?;
        Some((name, email, amount))
    }
}

/// Integer part of a JSON number or numeric string. Zero counts as absent.
fn parse_amount(value: &Value) -> Option<i64> {
    let amount = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }?;
    (amount != 0).then_some(amount)
}

/// Response of `POST /checkout/create`. Field names follow the mobile
/// client's expectations, including the `ephermalKey` spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    #[serde(rename = "paymentIntent")]
    pub payment_intent: PaymentIntent,
    #[serde(rename = "ephermalKey")]
    pub ephemeral_key: EphemeralKey,
    pub customer: String,
}

/// Body of `POST /checkout/pay`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayRequest {
    #[serde(default)]
    pub payment_method_id: String,
    #[serde(default)]
    pub payment_intent_id: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayResponse {
    pub result: PayResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayResult {
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Body of `POST /bookings`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(nested)]
    pub property: Property,
    /// Major units; must match the confirmed payment.
    #[validate(range(min = 1))]
    pub amount: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub property_id: String,
    pub property_name: String,
    pub amount: i64,
    pub payment_intent_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            property_id: booking.property_id,
            property_name: booking.property_name,
            amount: booking.amount,
            payment_intent_id: booking.payment_intent_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            created_at: booking.created_at,
        }
    }
}
