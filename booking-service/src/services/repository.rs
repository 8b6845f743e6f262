use crate::models::Booking;
use anyhow::Result;
use async_trait::async_trait;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{bson::doc, Collection, Database, IndexModel};

/// Persistence for committed bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: Booking) -> Result<()>;

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>>;

    /// Bookings of one user, newest first.
    async fn list_bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>>;
}

#[derive(Clone)]
pub struct BookingRepository {
    booking_collection: Collection<Booking>,
}

impl BookingRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            booking_collection: db.collection("bookings"),
        }
    }

    /// Initialize indexes for per-user listings and per-property lookups.
    pub async fn init_indexes(&self) -> Result<()> {
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_bookings_idx".to_string())
                    .build(),
            )
            .build();

        let property_index = IndexModel::builder()
            .keys(doc! { "property_id": 1, "start_date": 1 })
            .options(
                IndexOptions::builder()
                    .name("property_bookings_idx".to_string())
                    .build(),
            )
            .build();

        // One booking per payment.
        let payment_index = IndexModel::builder()
            .keys(doc! { "payment_intent_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_intent_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.booking_collection
            .create_indexes([user_index, property_index, payment_index], None)
            .await?;

        tracing::info!("Booking service indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn insert_booking(&self, booking: Booking) -> Result<()> {
        self.booking_collection.insert_one(booking, None).await?;
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        let filter = doc! { "_id": id };
        let booking = self.booking_collection.find_one(filter, None).await?;
        Ok(booking)
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        use futures::TryStreamExt;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .booking_collection
            .find(doc! { "user_id": user_id }, Some(options))
            .await?;

        let bookings: Vec<Booking> = cursor.try_collect().await?;
        Ok(bookings)
    }
}
