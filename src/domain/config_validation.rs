//! Configuration validation.
//!
//! Checks every bridge setting before a terminal session is opened.

use crate::domain::error::BridgeError;
use crate::ports::config_port::ConfigPort;

pub fn validate_bridge_config(config: &dyn ConfigPort) -> Result<(), BridgeError> {
    validate_terminal(config)?;
    validate_deviation(config)?;
    validate_magic_number(config)?;
    validate_default_volume(config)?;
    Ok(())
}

/// Settings needed to run against the paper terminal.
pub fn validate_paper_config(config: &dyn ConfigPort) -> Result<(), BridgeError> {
    if config.get_string("paper", "quotes").is_none() {
        return Err(BridgeError::ConfigMissing {
            section: "paper".to_string(),
            key: "quotes".to_string(),
        });
    }
    let balance = config.get_double("paper", "balance", 10_000.0);
    if balance <= 0.0 {
        return Err(BridgeError::ConfigInvalid {
            section: "paper".to_string(),
            key: "balance".to_string(),
            reason: "balance must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_terminal(config: &dyn ConfigPort) -> Result<(), BridgeError> {
    if config.get_u64("terminal", "login")?.is_none() {
        return Ok(());
    }
    for key in ["password", "server"] {
        if config.get_string("terminal", key).is_none() {
            return Err(BridgeError::ConfigMissing {
                section: "terminal".to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_deviation(config: &dyn ConfigPort) -> Result<(), BridgeError> {
    let value = config.get_int("trading", "deviation_points", 20);
    if !(0..=i64::from(u32::MAX)).contains(&value) {
        return Err(BridgeError::ConfigInvalid {
            section: "trading".to_string(),
            key: "deviation_points".to_string(),
            reason: "deviation_points must be a non-negative integer".to_string(),
        });
    }
    Ok(())
}

fn validate_magic_number(config: &dyn ConfigPort) -> Result<(), BridgeError> {
    let value = config.get_int("trading", "magic_number", 0);
    if value < 0 {
        return Err(BridgeError::ConfigInvalid {
            section: "trading".to_string(),
            key: "magic_number".to_string(),
            reason: "magic_number must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_default_volume(config: &dyn ConfigPort) -> Result<(), BridgeError> {
    let value = config.get_double("trading", "default_volume", 0.01);
    if value <= 0.0 {
        return Err(BridgeError::ConfigInvalid {
            section: "trading".to_string(),
            key: "default_volume".to_string(),
            reason: "default_volume must be positive".to_string(),
        });
    }
    Ok(())
}
