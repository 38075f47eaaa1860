//! Server settings read from the environment.

use std::time::Duration;

use estimo_protocol::Estimate;
use estimo_room::RoomConfig;
use estimo_transport::DEFAULT_HANDSHAKE_TIMEOUT;

use crate::EstimoError;

/// Path clients connect to unless `ESTIMO_PATH` says otherwise.
pub const DEFAULT_PATH: &str = "/planning-poker";

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Everything the binary needs to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// WebSocket path to accept upgrades on. `None` accepts any path.
    pub path: Option<String>,
    /// How long a new socket may take to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            path: Some(DEFAULT_PATH.to_string()),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `HOST`, `PORT`, `ESTIMO_PATH`, `ESTIMO_MASK` and
    /// `ESTIMO_HANDSHAKE_TIMEOUT_SECS`.
    ///
    /// An empty `ESTIMO_PATH` accepts connections on any path.
    pub fn from_env() -> Result<Self, EstimoError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EstimoError> {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string());

        if let Some(host) = var("HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = var("PORT").filter(|p| !p.is_empty()) {
            config.port = port
                .parse()
                .map_err(|_| EstimoError::Config(format!("PORT must be a port number, got {port:?}")))?;
        }
        if let Some(path) = var("ESTIMO_PATH") {
            config.path = if path.is_empty() {
                None
            } else if path.starts_with('/') {
                Some(path)
            } else {
                Some(format!("/{path}"))
            };
        }
        if let Some(secs) = var("ESTIMO_HANDSHAKE_TIMEOUT_SECS").filter(|s| !s.is_empty()) {
            let secs: u64 = secs.parse().map_err(|_| {
                EstimoError::Config(format!(
                    "ESTIMO_HANDSHAKE_TIMEOUT_SECS must be whole seconds, got {secs:?}"
                ))
            })?;
            if secs == 0 {
                return Err(EstimoError::Config(
                    "ESTIMO_HANDSHAKE_TIMEOUT_SECS must be at least 1".into(),
                ));
            }
            config.handshake_timeout = Duration::from_secs(secs);
        }
        if let Some(mask) = var("ESTIMO_MASK").filter(|m| !m.is_empty()) {
            config.room.mask = Estimate::String(mask);
        }

        Ok(config)
    }

    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
