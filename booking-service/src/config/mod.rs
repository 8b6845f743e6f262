use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub stripe: StripeSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    /// 0 binds a random port (tests).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3010
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub url: Secret<String>,
    #[serde(default = "default_db_name")]
    pub db_name: String,
}

fn default_db_name() -> String {
    "booking_db".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct StripeSettings {
    pub secret_key: Secret<String>,
    #[serde(default = "default_stripe_base_url")]
    pub api_base_url: String,
    /// API version ephemeral keys are pinned to; must match the mobile SDK.
    #[serde(default = "default_stripe_api_version")]
    pub api_version: String,
    /// Fixed settlement currency for every intent issued by this deployment.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_stripe_api_version() -> String {
    "2025-03-31.basil".to_string()
}

fn default_currency() -> String {
    "bgn".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info,booking_service=debug".to_string()
}

/// Load settings from `booking-service/config/base.yaml` and `APP_*` variables.
pub fn get_configuration() -> Result<Settings, AppError> {
    service_core::config::load_configuration("booking-service")
}
