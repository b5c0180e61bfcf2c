// ABOUTME: Diagnostics accumulator for endpoints that failed during a fan-out.
// ABOUTME: Collects per-endpoint failures that shouldn't fail the aggregate result.

use crate::endpoint::{EndpointError, ErrorKind};
use serde::Serialize;

/// Collects endpoint failures isolated during a fan-out operation.
#[derive(Debug, Default, Serialize)]
pub struct Diagnostics {
    failures: Vec<EndpointFailure>,
}

impl Diagnostics {
    /// Record a failure. Reporting it to the user is left to the caller.
    pub fn record(&mut self, endpoint: &str, error: &EndpointError) {
        tracing::debug!("skipping endpoint {}: {}", endpoint, error);
        self.failures.push(EndpointFailure {
            endpoint: endpoint.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    /// Get all collected failures.
    pub fn failures(&self) -> &[EndpointFailure] {
        &self.failures
    }

    /// Check if any endpoint failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Names of the endpoints that failed.
    pub fn failed_endpoints(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.endpoint.as_str())
    }
}

/// One endpoint that was skipped.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of a fan-out: whatever healthy endpoints produced, plus the failures.
#[derive(Debug, Default, Serialize)]
pub struct Aggregate<T> {
    pub items: T,
    pub diagnostics: Diagnostics,
}
