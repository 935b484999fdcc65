//! Configuration validation module
//!
//! Rules:
//! - field ranges declared on the contract types (`validator` derive)
//! - store.path not empty
//! - queue_capacity and deadline_secs stay under hard caps

use ::validator::Validate;

use contracts::{ContractError, FanoutConfig};

/// Upper bound on explicit work queue capacity
const MAX_QUEUE_CAPACITY: usize = 1_000_000;

/// Longest deadline accepted (one week)
const MAX_DEADLINE_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate FanoutConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &FanoutConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_store(config)?;
    validate_dispatch(config)?;
    Ok(())
}

/// Declarative range checks
fn validate_fields(config: &FanoutConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

fn validate_store(config: &FanoutConfig) -> Result<(), ContractError> {
    if config.store.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "store.path",
            "store path cannot be empty",
        ));
    }
    Ok(())
}

fn validate_dispatch(config: &FanoutConfig) -> Result<(), ContractError> {
    let dispatch = &config.dispatch;

    if dispatch.queue_capacity > MAX_QUEUE_CAPACITY {
        return Err(ContractError::config_validation(
            "dispatch.queue_capacity",
            format!(
                "queue_capacity must be <= {MAX_QUEUE_CAPACITY}, got {}",
                dispatch.queue_capacity
            ),
        ));
    }

    if dispatch.deadline_secs > MAX_DEADLINE_SECS {
        return Err(ContractError::config_validation(
            "dispatch.deadline_secs",
            format!(
                "deadline_secs must be <= {MAX_DEADLINE_SECS}, got {}",
                dispatch.deadline_secs
            ),
        ));
    }

    Ok(())
}
