use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Minor units per major currency unit for every supported currency.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Convert a major-unit price into minor units, `None` on overflow.
pub fn to_minor_units(amount: i64) -> Option<i64> {
    amount.checked_mul(MINOR_UNITS_PER_MAJOR)
}

/// Payment processor customer. Only the id is kept by this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
}

impl PaymentIntentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentIntentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentIntentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Processing => "processing",
            PaymentIntentStatus::RequiresCapture => "requires_capture",
            PaymentIntentStatus::Canceled => "canceled",
            PaymentIntentStatus::Succeeded => "succeeded",
        }
    }

    /// Money has been (or is being) collected; a booking may reference it.
    pub fn is_confirmed(self) -> bool {
        matches!(
            self,
            PaymentIntentStatus::Succeeded
                | PaymentIntentStatus::Processing
                | PaymentIntentStatus::RequiresCapture
        )
    }
}

/// Processor payment intent, in the processor's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: PaymentIntentStatus,
}

/// Short-lived key scoping the client's view of one customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EphemeralKey {
    pub id: String,
    pub secret: String,
    pub created: i64,
    pub expires: i64,
}

/// Processor object ids (`cus_...`, `pi_...`) are ASCII alphanumerics and
/// underscores. Anything else must never reach a request path.
pub fn is_processor_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// The listing being booked. `price` is in major units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Property {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[validate(range(min = 1))]
    pub price: i64,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("end date must be after start date")]
    EndNotAfterStart,
    #[error("start date must not be in the past")]
    StartsInPast,
}

/// A stay. Only constructible through [`DateRange::new`], so a value of this
/// type always has `start < end` and `start` on or after the day it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<Self, DateRangeError> {
        if end <= start {
            return Err(DateRangeError::EndNotAfterStart);
        }
        // end > start, so checking start covers both.
        if start.date_naive() < today {
            return Err(DateRangeError::StartsInPast);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Persisted reservation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub property_id: String,
    pub property_name: String,
    /// Amount paid, in major units.
    pub amount: i64,
    pub payment_intent_id: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
