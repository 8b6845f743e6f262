//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::handlers;
use crate::services::{
    BookingCommitter, BookingRepository, BookingStore, CustomerResolver, IntentIssuer,
    PaymentProcessor, StripeClient,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub customers: CustomerResolver,
    pub intents: IntentIssuer,
    pub committer: BookingCommitter,
}

impl AppState {
    /// Wire the checkout services around an injected processor and store.
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        store: Arc<dyn BookingStore>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            customers: CustomerResolver::new(processor.clone()),
            intents: IntentIssuer::new(processor, currency),
            committer: BookingCommitter::new(store),
        }
    }
}

/// Build the HTTP router with all middleware applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/checkout/create", post(handlers::checkout::create_payment))
        .route("/checkout/pay", post(handlers::checkout::pay))
        .route("/bookings", post(handlers::bookings::create_booking))
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/users/:user_id/bookings",
            get(handlers::bookings::list_user_bookings),
        )
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MongoDB, construct the Stripe client and bind the listener.
    pub async fn build(settings: Settings) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(settings.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::from(e)
            })?;
        client_options.app_name = Some("booking-service".to_string());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&settings.database.db_name);

        let repository = BookingRepository::new(&db);
        repository.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            AppError::DatabaseError(e)
        })?;

        let stripe = StripeClient::new(settings.stripe.clone());
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("Stripe secret key not configured - checkout will fail");
        }

        let state = AppState::new(
            Arc::new(stripe),
            Arc::new(repository),
            settings.stripe.currency.clone(),
        );

        Self::with_state(&settings.server.host, settings.server.port, state).await
    }

    /// Bind a listener for an already-wired state. Port 0 picks a free port.
    pub async fn with_state(host: &str, port: u16, state: AppState) -> Result<Self, AppError> {
        let address = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Booking service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
