// ABOUTME: Runtime info trait for engine clients.
// ABOUTME: Connectivity check that also reports the engine version.

use crate::engine::error::EngineError;
use crate::engine::types::EngineVersion;
use async_trait::async_trait;

#[async_trait]
pub trait RuntimeInfo: Send + Sync {
    /// Check connectivity and report the engine version.
    async fn ping(&self) -> Result<EngineVersion, EngineError>;
}
