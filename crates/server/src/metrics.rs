//! Prometheus metrics for the depot server.
//!
//! Counts uploads, merges and transferred bytes. The `/metrics` endpoint is
//! unauthenticated and should only be reachable by the scraper.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Upload metrics
pub static UPLOADS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_uploads_total",
            "Total uploads stored, by kind (whole or chunk)",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static BYTES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("depot_bytes_uploaded_total", "Total bytes written by uploads")
        .expect("metric creation failed")
});

// Download metrics
pub static BYTES_DOWNLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "depot_bytes_downloaded_total",
        "Total bytes streamed to download clients",
    )
    .expect("metric creation failed")
});

// Merge metrics
pub static MERGES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_merges_total",
            "Total merge triggers, by outcome (merged or incomplete)",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static MERGE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "depot_merge_duration_seconds",
            "Time taken to handle a merge trigger",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

// Error metrics
pub static TRANSFER_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_transfer_errors_total",
            "Total transfer errors by error type",
        ),
        &["error_type"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests can build many routers in one process.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(UPLOADS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_UPLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_DOWNLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MERGES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MERGE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TRANSFER_ERRORS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Helper to record transfer errors by type.
pub fn record_transfer_error(error_type: &str) {
    TRANSFER_ERRORS.with_label_values(&[error_type]).inc();
}
