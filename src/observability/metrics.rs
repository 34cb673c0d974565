//! Metrics collection and exposition.
//!
//! # Metrics
//! - `geo_rewrite_cache_lookups_total` (counter): mapping lookups by `result` (hit, miss)
//! - `geo_rewrite_mapping_fetches_total` (counter): remote fetches by `outcome`
//! - `geo_rewrite_decisions_total` (counter): routing decisions by `decision`
//! - `geo_rewrite_upstream_requests_total` (counter): forwarded requests by `status`
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Prometheus exporter runs its own HTTP listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a mapping cache lookup ("hit" or "miss").
pub fn record_cache_lookup(result: &'static str) {
    ::metrics::counter!("geo_rewrite_cache_lookups_total", "result" => result).increment(1);
}

/// Record the outcome of one remote mapping fetch.
pub fn record_mapping_fetch(outcome: &'static str) {
    ::metrics::counter!("geo_rewrite_mapping_fetches_total", "outcome" => outcome).increment(1);
}

/// Record a routing decision ("pass_through", "rewrite", "guarded").
pub fn record_decision(decision: &'static str) {
    ::metrics::counter!("geo_rewrite_decisions_total", "decision" => decision).increment(1);
}

/// Record a request forwarded to the upstream application.
pub fn record_upstream(status: u16) {
    ::metrics::counter!("geo_rewrite_upstream_requests_total", "status" => status.to_string())
        .increment(1);
}
