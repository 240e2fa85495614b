//! Driver configuration.

use std::time::Duration;

/// Limits applied by the driver while it waits on a transport.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Longest wait for any single handshake message.
    pub receive_timeout: Duration,
    /// Largest transport message accepted before the handshake aborts.
    pub max_message_len: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_secs(10),
            max_message_len: 16 * 1024,
        }
    }
}

impl DriverConfig {
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }
}
