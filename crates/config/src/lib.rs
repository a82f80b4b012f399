//! livedebug Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use livedebug_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[session]\nsample_rate = 0.5").unwrap();
//! assert_eq!(config.session.sample_rate, 0.5);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "debug"
//! format = "console"
//!
//! [session]
//! start_enabled = true
//! sample_rate = 1.0
//! settling_delay = "200ms"
//! buffer_capacity = 10000
//!
//! [provider]
//! socket_path = "/tmp/livedebug.sock"
//! connect_timeout = "5s"
//! ```

mod error;
mod logging;
mod provider;
mod session;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use provider::{DEFAULT_SOCKET_PATH, ProviderConfig};
pub use session::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_SETTLING_DELAY, MAX_BUFFER_CAPACITY, MAX_SETTLING_DELAY,
    SessionConfig,
};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Viewer session defaults (sampling, buffer, settling delay)
    pub session: SessionConfig,

    /// Stream provider connection settings
    pub provider: ProviderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert!(config.session.start_enabled);
        assert_eq!(config.session.sample_rate, 1.0);
        assert_eq!(config.session.settling_delay, DEFAULT_SETTLING_DELAY);
        assert_eq!(config.provider.socket_path.to_str(), Some(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[session]
start_enabled = false
sample_rate = 0.1
settling_delay = "300ms"
buffer_capacity = 2048

[provider]
socket_path = "/var/run/livedebug.sock"
connect_timeout = "1s"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(!config.session.start_enabled);
        assert_eq!(config.session.sample_rate, 0.1);
        assert_eq!(config.session.settling_delay, Duration::from_millis(300));
        assert_eq!(config.session.buffer_capacity, 2048);
        assert_eq!(
            config.provider.socket_path.to_str(),
            Some("/var/run/livedebug.sock")
        );
        assert_eq!(config.provider.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("[session\nsample_rate = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nbuffer_capacity = 42").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.session.buffer_capacity, 42);
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/definitely/not/here/livedebug.toml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
