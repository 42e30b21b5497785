//! Mock agent configuration, populated from environment variables.

use std::net::SocketAddr;

/// Runtime configuration for the mock agent.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `EIDAGENT_MOCK_BIND` | `127.0.0.1:24727` | TCP socket address to listen on |
/// | `EIDAGENT_MOCK_PATH` | `/eID-Client` | Path that accepts command envelopes |
/// | `EIDAGENT_MOCK_READER` | `Simulated Reader` | Name of the one attached reader |
/// | `EIDAGENT_MOCK_PIN` | `123456` | PIN the simulated card accepts |
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub bind_addr: SocketAddr,
    pub path: String,
    pub reader_name: String,
    pub pin: String,
}

/// Invalid environment configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("EIDAGENT_MOCK_BIND must be a socket address (e.g. 127.0.0.1:24727), got {0:?}")]
    InvalidBind(String),

    #[error("EIDAGENT_MOCK_PATH must start with '/', got {0:?}")]
    InvalidPath(String),
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 24727)),
            path: "/eID-Client".into(),
            reader_name: "Simulated Reader".into(),
            pin: "123456".into(),
        }
    }
}

impl AgentConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match std::env::var("EIDAGENT_MOCK_BIND") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidBind(raw))?,
            Err(_) => defaults.bind_addr,
        };

        let path = std::env::var("EIDAGENT_MOCK_PATH").unwrap_or(defaults.path);
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath(path));
        }

        Ok(Self {
            bind_addr,
            path,
            reader_name: std::env::var("EIDAGENT_MOCK_READER").unwrap_or(defaults.reader_name),
            pin: std::env::var("EIDAGENT_MOCK_PIN").unwrap_or(defaults.pin),
        })
    }
}
