// ABOUTME: Application-wide error types for dockfleet.
// ABOUTME: Wraps settings-file failures and endpoint errors for the binary.

use crate::endpoint::EndpointError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

pub type Result<T> = std::result::Result<T, Error>;
