//! Prometheus metrics

use crate::feed::{ConnectionState, RouteOutcome};
use ::metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

const FRAMES_TOTAL: &str = "tickerfeed_frames_total";
const RECONNECT_ATTEMPTS_TOTAL: &str = "tickerfeed_reconnect_attempts_total";
const RECONNECT_EXHAUSTED_TOTAL: &str = "tickerfeed_reconnect_exhausted_total";
const CALLBACK_PANICS_TOTAL: &str = "tickerfeed_callback_panics_total";
const HEARTBEATS_TOTAL: &str = "tickerfeed_heartbeats_sent_total";
const CONNECTION_STATE: &str = "tickerfeed_connection_state";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(FRAMES_TOTAL, "Inbound frames by routing outcome");
    describe_counter!(RECONNECT_ATTEMPTS_TOTAL, "Scheduled reconnect attempts");
    describe_counter!(
        RECONNECT_EXHAUSTED_TOTAL,
        "Reconnect cycles that ran out of attempts"
    );
    describe_counter!(CALLBACK_PANICS_TOTAL, "Consumer callbacks that panicked");
    describe_counter!(HEARTBEATS_TOTAL, "Heartbeat messages written to the feed");
    describe_gauge!(
        CONNECTION_STATE,
        "0=disconnected 1=connecting 2=connected 3=reconnecting 4=error"
    );
}

/// Serve metrics over HTTP on `port`
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    describe_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Count one routed frame
pub fn record_frame(outcome: RouteOutcome) {
    counter!(FRAMES_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

pub fn record_reconnect_attempt() {
    counter!(RECONNECT_ATTEMPTS_TOTAL).increment(1);
}

pub fn record_reconnect_exhausted() {
    counter!(RECONNECT_EXHAUSTED_TOTAL).increment(1);
}

/// Count a contained consumer panic; `kind` is "ticker" or "status"
pub fn record_callback_panic(kind: &'static str) {
    counter!(CALLBACK_PANICS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_heartbeat() {
    counter!(HEARTBEATS_TOTAL).increment(1);
}

pub fn set_connection_state(state: ConnectionState) {
    gauge!(CONNECTION_STATE).set(state.code());
}
