//! ticker-feed: Real-time ticker client for a single exchange WebSocket feed
//!
//! This library provides the core components for:
//! - One multiplexed WebSocket session per connection attempt
//! - Topic subscriptions that survive reconnects and are replayed in one batch
//! - Bounded linear-backoff reconnection
//! - Heartbeat keep-alive while connected
//! - Connection status observers
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod feed;
pub mod telemetry;
pub mod ws;
