use serde::{Deserialize, Serialize};

/// Settings shared by the bundled HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout, connection included.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Idle keep-alive connections kept in the pool.
    pub max_idle_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 5,
            max_idle_connections: 10,
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..Self::default()
        }
    }
}
