// ABOUTME: Endpoint error types with SNAFU pattern.
// ABOUTME: Tags engine, compose, and configuration failures with the endpoint that produced them.

use snafu::Snafu;
use std::time::Duration;

use crate::compose::ComposeError;
use crate::config::ConfigError;
use crate::engine::EngineError;

/// Unified error for operations routed to an endpoint.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EndpointError {
    #[snafu(display("endpoint {endpoint}: {source}"))]
    Engine {
        endpoint: String,
        source: EngineError,
    },

    #[snafu(display("endpoint {endpoint}: compose {action} failed: {source}"))]
    Compose {
        endpoint: String,
        action: &'static str,
        source: ComposeError,
    },

    #[snafu(display("invalid endpoint configuration: {source}"))]
    Config { source: ConfigError },

    #[snafu(display("endpoint {endpoint}: no response within {timeout:?}"))]
    Timeout { endpoint: String, timeout: Duration },

    #[snafu(display("unknown endpoint: {name}"))]
    UnknownEndpoint { name: String },

    #[snafu(display("container {identifier} not found on any endpoint"))]
    ContainerNotFound { identifier: String },

    #[snafu(display("no endpoints registered"))]
    NoEndpoints,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Identifier or endpoint does not resolve.
    NotFound,
    /// Operation invalid for the current state.
    Conflict,
    /// Endpoint unreachable or timed out.
    TransportFailure,
    /// External Compose tool failed.
    ComposeFailure,
    /// Endpoint configuration is incomplete or unusable.
    ConfigurationError,
    /// Engine reported some other failure.
    EngineFailure,
}

impl EndpointError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EndpointError::Engine { source, .. } => match source {
                EngineError::NotFound(_) => ErrorKind::NotFound,
                EngineError::Conflict(_) => ErrorKind::Conflict,
                EngineError::Transport(_) => ErrorKind::TransportFailure,
                EngineError::Engine(_) => ErrorKind::EngineFailure,
            },
            EndpointError::Compose { .. } => ErrorKind::ComposeFailure,
            EndpointError::Config { .. } | EndpointError::NoEndpoints => {
                ErrorKind::ConfigurationError
            }
            EndpointError::Timeout { .. } => ErrorKind::TransportFailure,
            EndpointError::UnknownEndpoint { .. } | EndpointError::ContainerNotFound { .. } => {
                ErrorKind::NotFound
            }
        }
    }

    /// The endpoint the failure is attributed to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            EndpointError::Engine { endpoint, .. }
            | EndpointError::Compose { endpoint, .. }
            | EndpointError::Timeout { endpoint, .. } => Some(endpoint),
            EndpointError::UnknownEndpoint { name } => Some(name),
            _ => None,
        }
    }

    /// Exit code of a failed Compose run.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            EndpointError::Compose { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}
