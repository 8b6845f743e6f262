//! Booking commit: the last step of a paid checkout.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CheckoutError, Result};
use crate::models::{Booking, DateRange, Property};
use crate::services::metrics;
use crate::services::repository::BookingStore;

#[derive(Clone)]
pub struct BookingCommitter {
    store: Arc<dyn BookingStore>,
}

impl BookingCommitter {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Persist a booking for a payment that has already been confirmed.
    ///
    /// `dates` is a validated [`DateRange`], so ordering is not rechecked here.
    /// A store failure leaves nothing behind and is reported as
    /// [`CheckoutError::Persistence`].
    pub async fn commit_booking(
        &self,
        user_id: &str,
        amount: i64,
        dates: &DateRange,
        created_at: DateTime<Utc>,
        property: &Property,
        payment_intent_id: &str,
    ) -> Result<Booking> {
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            property_id: property.id.clone(),
            property_name: property.name.clone(),
            amount,
            payment_intent_id: payment_intent_id.to_string(),
            start_date: dates.start(),
            end_date: dates.end(),
            created_at,
        };

        if let Err(e) = self.store.insert_booking(booking.clone()).await {
            metrics::record_booking_failed();
            tracing::error!(
                error = %e,
                user_id,
                property_id = %property.id,
                payment_intent_id,
                "Failed to persist booking"
            );
            return Err(CheckoutError::Persistence(e));
        }

        metrics::record_booking_committed();
        tracing::info!(
            booking_id = %booking.id,
            user_id,
            property_id = %property.id,
            payment_intent_id,
            "Booking committed"
        );

        Ok(booking)
    }

    pub async fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        self.store
            .get_booking(id)
            .await
            .map_err(CheckoutError::Persistence)
    }

    pub async fn list_bookings(&self, user_id: &str) -> Result<Vec<Booking>> {
        self.store
            .list_bookings_for_user(user_id)
            .await
            .map_err(CheckoutError::Persistence)
    }
}
