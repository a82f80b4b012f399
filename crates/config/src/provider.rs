//! Stream provider configuration
//!
//! Where the live-debug socket lives and how long to wait for it.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/livedebug.sock";

/// Provider configuration
///
/// # Example
///
/// ```toml
/// [provider]
/// socket_path = "/run/agent/livedebug.sock"
/// connect_timeout = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Path to the live-debug Unix socket
    /// Default: /tmp/livedebug.sock
    pub socket_path: PathBuf,

    /// Maximum time to wait for the socket connection
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/livedebug.sock"));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
socket_path = "/run/agent/debug.sock"
connect_timeout = "250ms"
"#;
        let config: ProviderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/run/agent/debug.sock"));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
    }
}
