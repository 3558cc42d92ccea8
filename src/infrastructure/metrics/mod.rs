//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Active gateway sessions
//! - Pending message deliveries and redelivery attempts
//! - Wallet transfers by kind

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "market_server";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Identified gateway sessions
pub static GATEWAY_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("gateway_sessions_active", "Number of identified gateway sessions")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create GATEWAY_SESSIONS_ACTIVE metric")
});

/// Messages pushed but not yet acknowledged
pub static PENDING_DELIVERIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("pending_deliveries", "Messages awaiting a delivery ack").namespace(NAMESPACE),
    )
    .expect("Failed to create PENDING_DELIVERIES metric")
});

/// Redelivery outcomes: "resent", "expired", "offline"
pub static DELIVERY_RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("delivery_retries_total", "Redelivery sweep outcomes").namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create DELIVERY_RETRIES_TOTAL metric")
});

/// Completed wallet movements by ledger kind
pub static WALLET_TRANSFERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wallet_transfers_total", "Completed wallet movements").namespace(NAMESPACE),
        &["kind"],
    )
    .expect("Failed to create WALLET_TRANSFERS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(GATEWAY_SESSIONS_ACTIVE.clone()))
        .expect("Failed to register GATEWAY_SESSIONS_ACTIVE");
    registry
        .register(Box::new(PENDING_DELIVERIES.clone()))
        .expect("Failed to register PENDING_DELIVERIES");
    registry
        .register(Box::new(DELIVERY_RETRIES_TOTAL.clone()))
        .expect("Failed to register DELIVERY_RETRIES_TOTAL");
    registry
        .register(Box::new(WALLET_TRANSFERS_TOTAL.clone()))
        .expect("Failed to register WALLET_TRANSFERS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn set_gateway_sessions(count: usize) {
    GATEWAY_SESSIONS_ACTIVE.set(count as i64);
}

pub fn set_pending_deliveries(count: usize) {
    PENDING_DELIVERIES.set(count as i64);
}

pub fn record_delivery_retry(outcome: &str) {
    DELIVERY_RETRIES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_wallet_transfer(kind: &str) {
    WALLET_TRANSFERS_TOTAL.with_label_values(&[kind]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Force lazy initialization
        let _ = &*REGISTRY;
        let _ = &*HTTP_REQUESTS_TOTAL;
        let _ = &*PENDING_DELIVERIES;
        let _ = &*WALLET_TRANSFERS_TOTAL;
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("market_server_http_requests_total"));
    }

    #[test]
    fn test_record_wallet_transfer() {
        record_wallet_transfer("transfer");
        let metrics = gather_metrics();
        assert!(metrics.contains("market_server_wallet_transfers_total"));
    }
}
