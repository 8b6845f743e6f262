//! Client side of the checkout: the payment sheet, the backend client and the
//! flow that ties them together.

pub mod backend;
pub mod flow;
pub mod sheet;

pub use backend::{BackendClient, BackendClientConfig, BackendError, CheckoutBackend};
pub use flow::{
    BookingDraft, CheckoutFailure, CheckoutFlow, CheckoutOutcome, CheckoutRequest,
    CheckoutSettings, CheckoutState, CheckoutUser, ConfirmedPayment,
};
pub use sheet::{PaymentMethod, PaymentSheet, SheetCompletion, SheetConfig, SheetEvent};
