//! Error types for policy loading and evaluation

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AclError>;

#[derive(Debug, Error)]
pub enum AclError {
    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has the wrong shape, e.g. a string where a list is expected
    #[error("Invalid config field: {message}")]
    Schema { message: String },

    #[error("Invalid CIDR notation in {field}: {cidr}")]
    InvalidCidr { field: &'static str, cidr: String },

    #[error("Invalid time of day in {field}: {value}")]
    InvalidTime { field: &'static str, value: String },

    #[error("Invalid hostname in {field}: {host:?}")]
    InvalidHostname { field: &'static str, host: String },

    #[error("Invalid domain in {field}: {domain:?}")]
    InvalidDomain { field: &'static str, domain: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Failure of a blacklist lookup
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Lookup timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Resolver error: {0}")]
    Resolver(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}
