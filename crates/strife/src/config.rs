//! Server configuration.
//!
//! Read once at startup from a JSON file and never changed afterwards.
//! Every key is optional; anything missing takes its default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strife_room::RoomData;

use crate::StrifeError;

/// Greeting sent to every client right after accept.
pub const DEFAULT_WELCOME: &str =
    "Welcome to the super awesome server This is a server message!";

/// Top-level server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server_name: String,
    pub server_port: u16,
    pub server_address: String,
    /// Send a ping request to every connection on a fixed interval.
    pub ping_connections: bool,
    pub ping_interval_ms: u64,
    /// Drop a connection after this many silent seconds. 0 disables it.
    pub idle_timeout_secs: u64,
    pub welcome_message: String,
    /// Frames a connection may have queued before it is dropped as too slow.
    pub outbound_queue_len: usize,
    /// How long a closing connection may spend flushing queued frames.
    pub drain_timeout_ms: u64,
    pub room_data: RoomData,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "Default MUD server".to_string(),
            server_port: 1337,
            server_address: "0.0.0.0".to_string(),
            ping_connections: false,
            ping_interval_ms: 3000,
            idle_timeout_secs: 0,
            welcome_message: DEFAULT_WELCOME.to_string(),
            outbound_queue_len: 1024,
            drain_timeout_ms: 2000,
            room_data: RoomData::default(),
        }
    }
}

impl ServerConfig {
    /// `address:port` to bind the listener to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_address, self.server_port)
    }

    /// Keep-alive period. Never zero.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms.max(1))
    }

    /// Outbound queue capacity. Never zero.
    pub fn outbound_queue_len(&self) -> usize {
        self.outbound_queue_len.max(1)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Parses a JSON document.
    pub fn from_json(text: &str) -> Result<Self, StrifeError> {
        serde_json::from_str(text).map_err(|e| StrifeError::Config(e.to_string()))
    }

    /// Reads the config at `path`, first writing the defaults there if the
    /// file does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self, StrifeError> {
        if !tokio::fs::try_exists(path).await? {
            let defaults = Self::default();
            let json = serde_json::to_string_pretty(&defaults)
                .map_err(|e| StrifeError::Config(e.to_string()))?;
            tokio::fs::write(path, json).await?;
            tracing::info!(path = %path.display(), "wrote default server config");
            return Ok(defaults);
        }

        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "loaded server config");
        Ok(config)
    }
}
