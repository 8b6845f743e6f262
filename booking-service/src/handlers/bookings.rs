//! Booking endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{BookingResponse, CreateBookingRequest},
    error::CheckoutError,
    models::DateRange,
    AppState,
};

/// Commit a booking for a confirmed payment.
///
/// The date range is validated against today's date, and the referenced
/// payment intent must be confirmed for the same amount before anything is
/// written.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    payload.validate()?;

    let now = Utc::now();
    let dates = DateRange::new(payload.start_date, payload.end_date, now.date_naive())
        .map_err(CheckoutError::from)?;

    tracing::info!(
        user_id = %payload.user_id,
        property_id = %payload.property.id,
        payment_intent_id = %payload.payment_intent_id,
        "Creating booking"
    );

    state
        .intents
        .verify_confirmed(&payload.payment_intent_id, payload.amount)
        .await?;

    let booking = state
        .committer
        .commit_booking(
            &payload.user_id,
            payload.amount,
            &dates,
            now,
            &payload.property,
            &payload.payment_intent_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .committer
        .get_booking(&booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    Ok(Json(BookingResponse::from(booking)))
}

pub async fn list_user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.committer.list_bookings(&user_id).await?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}
