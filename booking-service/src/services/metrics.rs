use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Until this runs, every counter below is
/// a no-op, which is what tests rely on.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already initialized"))
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record an issued payment intent and its amount in minor units.
pub fn record_intent(currency: &str, amount_minor: i64) {
    counter!("checkout_intents_total").increment(1);
    counter!("checkout_amount_minor_total", "currency" => currency.to_string())
        .increment(amount_minor.max(0) as u64);
}

pub fn record_booking_committed() {
    counter!("bookings_committed_total").increment(1);
}

pub fn record_booking_failed() {
    counter!("bookings_failed_total").increment(1);
}
