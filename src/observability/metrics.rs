//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_accepted_total` (counter): inbound connections accepted
//! - `relay_sessions_active` (gauge): sessions not yet closed
//! - `relay_sessions_closed_total` (counter): closed sessions by reason
//! - `relay_bytes_forwarded_total` (counter): bytes written, by direction
//! - `relay_descriptors_rewritten_total` (counter): cut-mode injections
//! - `relay_upstream_connect_failures_total` (counter)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - The Prometheus exporter is optional and off by default

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::payload::Direction;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_session_accepted() {
    metrics::counter!("relay_sessions_accepted_total").increment(1);
    metrics::gauge!("relay_sessions_active").increment(1.0);
}

pub fn record_session_closed(reason: &'static str) {
    metrics::counter!("relay_sessions_closed_total", "reason" => reason).increment(1);
    metrics::gauge!("relay_sessions_active").decrement(1.0);
}

pub fn record_forwarded(direction: Direction, bytes: usize) {
    metrics::counter!("relay_bytes_forwarded_total", "direction" => direction.as_str())
        .increment(bytes as u64);
}

pub fn record_rewrite() {
    metrics::counter!("relay_descriptors_rewritten_total").increment(1);
}

pub fn record_upstream_connect_failure() {
    metrics::counter!("relay_upstream_connect_failures_total").increment(1);
}
