//! Configuration validation functionality.
//!
//! Rejects values that would make the scheduler or geocoder misbehave, such
//! as a zero timeout or a retry loop tighter than the applier can keep up with.

use anyhow::Result;

use super::Config;
use crate::constants::*;

/// Validate every field that is present; absent fields use defaults.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(url) = &config.geocoder_url {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            anyhow::bail!("geocoder_url must not be empty");
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            anyhow::bail!("geocoder_url must be an http:// or https:// URL (got {trimmed})");
        }
    }

    validate_range(
        config.geocode_timeout,
        "geocode_timeout",
        MINIMUM_GEOCODE_TIMEOUT,
        MAXIMUM_GEOCODE_TIMEOUT,
    )?;
    validate_range(
        config.apply_timeout,
        "apply_timeout",
        MINIMUM_APPLY_TIMEOUT,
        MAXIMUM_APPLY_TIMEOUT,
    )?;
    validate_range(
        config.retry_interval,
        "retry_interval",
        MINIMUM_RETRY_INTERVAL,
        MAXIMUM_RETRY_INTERVAL,
    )?;
    validate_range(
        config.clock_check_interval,
        "clock_check_interval",
        MINIMUM_CLOCK_CHECK_INTERVAL,
        MAXIMUM_CLOCK_CHECK_INTERVAL,
    )?;

    // An apply that may outlast the retry interval would always be refused
    if let (Some(apply), Some(retry)) = (config.apply_timeout, config.retry_interval)
        && apply >= retry
    {
        anyhow::bail!(
            "apply_timeout ({apply}s) must be shorter than retry_interval ({retry}s)"
        );
    }

    for (name, command) in [
        ("light_command", &config.light_command),
        ("dark_command", &config.dark_command),
    ] {
        if let Some(cmd) = command
            && cmd.trim().is_empty()
        {
            anyhow::bail!("{name} must not be empty; remove the line to disable the hook");
        }
    }

    Ok(())
}

fn validate_range(value: Option<u64>, name: &str, min: u64, max: u64) -> Result<()> {
    if let Some(value) = value
        && !(min..=max).contains(&value)
    {
        anyhow::bail!("{name} ({value}s) must be between {min} and {max} seconds");
    }
    Ok(())
}
