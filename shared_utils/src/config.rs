use std::{fmt::Display, str::FromStr};

use thiserror::Error;

use crate::env::get_env_opt;

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but cannot be parsed into the expected type.
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Parses an optional typed override from the environment.
///
/// Returns `Ok(None)` when the variable is unset or blank, so callers can keep
/// whatever value their config file (or default) provided.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn env_override<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match get_env_opt(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
                reason: e.to_string(),
            }),
    }
}

/// Overwrites `slot` with the parsed environment value when one is present.
pub fn apply_env_override<T>(slot: &mut T, name: &str) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(v) = env_override(name)? {
        *slot = v;
    }
    Ok(())
}
