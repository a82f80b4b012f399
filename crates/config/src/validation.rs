//! Configuration validation
//!
//! Validates value ranges that serde cannot express:
//! - Sampling probability is a finite value in [0, 1]
//! - Settling delay is non-zero and bounded
//! - Buffer capacity is non-zero and bounded
//! - Connect timeout is non-zero

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::session::{MAX_BUFFER_CAPACITY, MAX_SETTLING_DELAY};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_session(config)?;
    validate_provider(config)?;
    Ok(())
}

fn validate_session(config: &Config) -> Result<()> {
    let session = &config.session;

    if !session.sample_rate.is_finite() || !(0.0..=1.0).contains(&session.sample_rate) {
        return Err(ConfigError::invalid_value(
            "session",
            "sample_rate",
            format!("{} is not within [0, 1]", session.sample_rate),
        ));
    }

    if session.settling_delay.is_zero() {
        return Err(ConfigError::invalid_value(
            "session",
            "settling_delay",
            "must be greater than zero",
        ));
    }

    if session.settling_delay > MAX_SETTLING_DELAY {
        return Err(ConfigError::invalid_value(
            "session",
            "settling_delay",
            format!("must not exceed {}s", MAX_SETTLING_DELAY.as_secs()),
        ));
    }

    if session.buffer_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "session",
            "buffer_capacity",
            "must be greater than zero",
        ));
    }

    if session.buffer_capacity > MAX_BUFFER_CAPACITY {
        return Err(ConfigError::invalid_value(
            "session",
            "buffer_capacity",
            format!("must not exceed {MAX_BUFFER_CAPACITY}"),
        ));
    }

    Ok(())
}

fn validate_provider(config: &Config) -> Result<()> {
    if config.provider.connect_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "provider",
            "connect_timeout",
            "must be greater than zero",
        ));
    }

    if config.provider.socket_path.as_os_str().is_empty() {
        return Err(ConfigError::invalid_value(
            "provider",
            "socket_path",
            "must not be empty",
        ));
    }

    Ok(())
}
