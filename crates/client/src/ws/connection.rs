//! Connection state and reconnect backoff for the realtime channel.

use std::time::Duration;

/// Connection state for the realtime channel
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Never connected, or torn down.
    Idle,
    Connecting,
    Open,
    /// Closed cleanly, or closed without a reconnect scheduled yet.
    Closed,
    /// Waiting `delay` before reconnect attempt `attempt` (1-indexed).
    Reconnecting { attempt: u32, delay: Duration },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }

    /// Whether a view should show an offline indicator.
    pub fn is_offline(&self) -> bool {
        !self.is_connected()
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive automatic attempts
    pub max_attempts: u32,
    /// Base delay in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Delay before attempt `attempt` (1-indexed): `initial * multiplier^attempt`,
    /// capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}
