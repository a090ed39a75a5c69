//! # Configuration
//!
//! Sync options, APIM service coordinates and executor sizing. Every struct
//! has defaults and a `from_env()` loader; CLI flags are applied on top.

pub mod executor;
pub mod service;
pub mod sync;

pub use executor::ExecutorConfig;
pub use service::ServiceConfig;
pub use sync::SyncOptions;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid api id `{0}`: expected `<name>` or `<name>;rev=<number>`")]
    InvalidApiId(String),
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a required, non-empty environment variable
pub(crate) fn required_env(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(key))
}

/// Read an optional environment variable, treating empty as unset
pub(crate) fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
