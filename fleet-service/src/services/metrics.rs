//! Prometheus metrics for fleet-service.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::time::Instant;

/// HTTP request counter by route, method and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_http_requests_total",
        "Total number of HTTP requests",
        &["route", "method", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// HTTP request duration histogram by route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "fleet_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Issued invoices by owning firm.
pub static BILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_bills_total",
        "Total number of invoices issued",
        &["own_firm_id"]
    )
    .expect("Failed to register bills_total")
});

/// Credit-note events (created, completed, reopened).
pub static CREDIT_NOTES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_credit_notes_total",
        "Credit-note lifecycle events",
        &["event"]
    )
    .expect("Failed to register credit_notes_total")
});

/// Credit-note payments by action (posted, reversed).
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_credit_note_payments_total",
        "Credit-note payments by action",
        &["action"]
    )
    .expect("Failed to register payments_total")
});

/// Generated exports by kind (invoice_pdf, roster_xlsx).
pub static EXPORTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_exports_total",
        "Generated documents by kind",
        &["kind"]
    )
    .expect("Failed to register exports_total")
});

/// Audit entries written.
pub static AUDIT_ENTRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_audit_entries_total",
        "Audit entries by kind",
        &["kind"] // event, mutation
    )
    .expect("Failed to register audit_entries_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fleet_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Store operation duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "fleet_db_query_duration_seconds",
        "Store operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&BILLS_TOTAL);
    Lazy::force(&CREDIT_NOTES_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&EXPORTS_TOTAL);
    Lazy::force(&AUDIT_ENTRIES_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Records request count and latency per matched route.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&route, &method, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&route])
        .observe(started.elapsed().as_secs_f64());
    if status.is_client_error() || status.is_server_error() {
        ERRORS_TOTAL.with_label_values(&[status.as_str()]).inc();
    }

    response
}
