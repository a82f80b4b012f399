//! Stream session configuration
//!
//! Initial state of a viewer session: whether it streams on start, which
//! sampling probability is in effect, how long the sampling restart waits
//! between teardown and setup, and how many records the display buffer keeps.

use serde::Deserialize;
use std::time::Duration;

/// Default settling delay between unsubscribe and re-subscribe
pub const DEFAULT_SETTLING_DELAY: Duration = Duration::from_millis(200);

/// Default display buffer capacity (records)
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

/// Upper bound on the display buffer capacity
pub const MAX_BUFFER_CAPACITY: usize = 1_000_000;

/// Upper bound on the settling delay
pub const MAX_SETTLING_DELAY: Duration = Duration::from_secs(10);

/// Session configuration
///
/// # Example
///
/// ```toml
/// [session]
/// start_enabled = true
/// sample_rate = 0.25
/// settling_delay = "200ms"
/// buffer_capacity = 10000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Start streaming as soon as the session is created
    /// Default: true
    pub start_enabled: bool,

    /// Initial sampling probability (0.0 - 1.0)
    /// Default: 1.0
    pub sample_rate: f64,

    /// Pause between tearing down a subscription and re-establishing it
    /// after a sampling change
    /// Default: 200ms
    #[serde(with = "humantime_serde")]
    pub settling_delay: Duration,

    /// Maximum records kept in the display buffer (oldest dropped first)
    /// Default: 10000
    pub buffer_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
            sample_rate: 1.0,
            settling_delay: DEFAULT_SETTLING_DELAY,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Set the initial sampling probability
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the settling delay
    pub fn with_settling_delay(mut self, delay: Duration) -> Self {
        self.settling_delay = delay;
        self
    }

    /// Set the buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set whether the session streams on start
    pub fn with_start_enabled(mut self, enabled: bool) -> Self {
        self.start_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.start_enabled);
        assert_eq!(config.sample_rate, 1.0);
        assert_eq!(config.settling_delay, Duration::from_millis(200));
        assert_eq!(config.buffer_capacity, 10_000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
start_enabled = false
sample_rate = 0.25
settling_delay = "50ms"
buffer_capacity = 500
"#;
        let config: SessionConfig = toml::from_str(toml).unwrap();
        assert!(!config.start_enabled);
        assert_eq!(config.sample_rate, 0.25);
        assert_eq!(config.settling_delay, Duration::from_millis(50));
        assert_eq!(config.buffer_capacity, 500);
    }

    #[test]
    fn test_deserialize_delay_variants() {
        for (s, expected) in [
            ("100ms", Duration::from_millis(100)),
            ("1s", Duration::from_secs(1)),
            ("2s 500ms", Duration::from_millis(2500)),
        ] {
            let toml = format!("settling_delay = \"{}\"", s);
            let config: SessionConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.settling_delay, expected, "Failed for {}", s);
        }
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_sample_rate(0.5)
            .with_settling_delay(Duration::from_millis(10))
            .with_buffer_capacity(3)
            .with_start_enabled(false);
        assert_eq!(config.sample_rate, 0.5);
        assert_eq!(config.settling_delay, Duration::from_millis(10));
        assert_eq!(config.buffer_capacity, 3);
        assert!(!config.start_enabled);
    }
}
