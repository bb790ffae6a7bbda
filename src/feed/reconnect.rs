//! Reconnection policy
//!
//! Linear backoff with a hard attempt ceiling. Attempt `n` (1-based) waits
//! `base_delay * n`. Once the ceiling is reached the policy refuses further
//! attempts until it is reset by a successful connect or a manual restart.

use std::time::Duration;

/// Configuration for reconnection behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive reconnection attempts
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `n` units
    pub base_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl ReconnectConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }
}

/// Attempt counter plus the backoff rule
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Claim the next attempt and return how long to wait before it.
    ///
    /// Returns `None` once the ceiling has been reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.config.base_delay.saturating_mul(self.attempts))
    }

    /// Start a fresh cycle after a successful connect
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Use up the remaining attempts so no reconnect will be scheduled
    pub fn saturate(&mut self) {
        self.attempts = self.config.max_attempts;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts
    }
}
