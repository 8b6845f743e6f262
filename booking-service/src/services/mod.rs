pub mod bookings;
pub mod customers;
pub mod intents;
pub mod metrics;
pub mod processor;
pub mod repository;
pub mod stripe;

#[cfg(test)]
pub(crate) mod testing;

pub use bookings::BookingCommitter;
pub use customers::CustomerResolver;
pub use intents::{IntentConfirmation, IntentIssuer, IssuedIntent};
pub use metrics::{get_metrics, init_metrics};
pub use processor::{NewPaymentIntent, PaymentProcessor, ProcessorError};
pub use repository::{BookingRepository, BookingStore};
pub use stripe::StripeClient;
