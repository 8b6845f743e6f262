//! The hosted payment sheet, as seen by the checkout flow.

use async_trait::async_trait;

/// Deferred intent configuration the sheet opens with: the amount is known
/// but no intent exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub merchant_display_name: String,
    /// Minor units.
    pub amount: i64,
    pub currency_code: String,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethod {
    pub id: String,
}

/// What the user did with the presented sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetEvent {
    PaymentMethodSelected(PaymentMethod),
    Canceled,
    Failed { code: String, message: String },
}

/// Final signal handed back so the sheet can close cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetCompletion {
    Succeeded { client_secret: String },
    Failed { code: String, message: String },
}

#[async_trait]
pub trait PaymentSheet: Send + Sync {
    /// Show the sheet and wait for the user to pick a payment method or
    /// dismiss it.
    async fn present(&self, config: &SheetConfig) -> SheetEvent;

    /// Close the sheet with the checkout's result.
    async fn complete(&self, completion: SheetCompletion);
}
