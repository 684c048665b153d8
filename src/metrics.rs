//! Prometheus telemetry for the analysis service.

use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("analyses_total", "Articles run through the fusion pipeline.");
        describe_counter!(
            "corroborations_found_total",
            "Corroborating matches found across all analyses."
        );
        describe_counter!(
            "store_errors_total",
            "Analysis store failures (append or summarize)."
        );
    });
}

pub struct Telemetry {
    pub handle: PrometheusHandle,
}

impl Telemetry {
    /// Initialize the Prometheus recorder. Call once from the binary.
    pub fn init(corroboration_threshold: f64) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();

        // Static gauge with the active threshold, for dashboard context.
        gauge!("corroboration_threshold").set(corroboration_threshold);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
