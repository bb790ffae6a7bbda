//! Heartbeat timer
//!
//! Keeps at most one recurring keep-alive task alive. The connection manager
//! starts it on open and stops it on every exit from the connected state.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Shortest interval the timer will run with
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for heartbeat behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between keep-alive messages
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(30_000),
        }
    }
}

impl HeartbeatConfig {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Owner of the single heartbeat task
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self { config, task: None }
    }

    /// Start beating, replacing any running timer.
    ///
    /// `beat` runs once per interval, first after one full interval. Returning
    /// `false` ends the timer. A zero interval is raised to one millisecond.
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, beat: F)
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.stop();

        let period = self.config.interval.max(MIN_INTERVAL);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !beat() {
                    tracing::debug!("Heartbeat stopped by sender");
                    break;
                }
            }
        }));

        tracing::debug!(interval_ms = period.as_millis() as u64, "Heartbeat started");
    }

    /// Cancel the running timer, if any. Takes effect before returning.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Heartbeat stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
