//! Environment variable helpers

use crate::Secret;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Variable is missing or blank
    #[error("environment variable {0} is not set")]
    Missing(String),

    /// Variable is set but does not parse
    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Read a non-blank string variable
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable, `Ok(None)` when it is unset
pub fn env_parse<T>(name: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| EnvError::Invalid {
            name: name.to_string(),
            value: raw,
            reason: e.to_string(),
        }),
    }
}

/// Read the first non-blank variable out of `names` as a [`Secret`]
pub fn require_env(names: &[&str]) -> Result<Secret, EnvError> {
    names
        .iter()
        .find_map(|name| env_string(name))
        .map(Secret::from)
        .ok_or_else(|| EnvError::Missing(names.join(" or ")))
}
