//! Prometheus metrics for facturacion-service.
//!
//! Service counters live in the default prometheus registry. The HTTP
//! middleware in service-core records through the `metrics` facade, so a
//! facade recorder is installed here and both are rendered together.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, HistogramVec,
    IntGauge, TextEncoder,
};
use service_core::error::AppError;

/// Invoices written, by operation (create, replace).
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "facturacion_invoices_total",
        "Total number of invoices written",
        &["operation"]
    )
    .expect("Failed to register invoices_total")
});

/// Invoiced amount in pesos, by operation.
pub static INVOICE_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "facturacion_invoice_amount_total",
        "Total invoiced amount",
        &["operation"]
    )
    .expect("Failed to register invoice_amount_total")
});

/// Line item and draft edits rejected by business rules.
pub static VALIDATION_REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "facturacion_validation_rejections_total",
        "Edits rejected by invoice rules",
        &["reason"]
    )
    .expect("Failed to register validation_rejections_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "facturacion_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "facturacion_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Drafts currently held in memory.
pub static DRAFTS_OPEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("facturacion_drafts_open", "Invoice drafts held in memory")
        .expect("Failed to register drafts_open")
});

static RECORDER_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the global `metrics` recorder once per process.
fn recorder_handle() -> Option<&'static PrometheusHandle> {
    RECORDER_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "metrics recorder not installed");
                None
            }
        })
        .as_ref()
}

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    recorder_handle();
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&INVOICE_AMOUNT_TOTAL);
    Lazy::force(&VALIDATION_REJECTIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&DRAFTS_OPEN);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut body = encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default();
    if let Some(handle) = recorder_handle() {
        body.push_str(&handle.render());
    }
    body
}

/// Count a rule rejection and convert it for the HTTP layer.
pub fn rejection<E: Into<AppError>>(reason: &str, err: E) -> AppError {
    VALIDATION_REJECTIONS_TOTAL.with_label_values(&[reason]).inc();
    err.into()
}

/// Count a failed storage or delivery call.
pub fn record_error(err: &AppError) {
    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
}
