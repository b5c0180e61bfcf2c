// ABOUTME: Network and volume listing traits for engine clients.
// ABOUTME: Read-only views; results are passed through as documents.

use crate::engine::error::EngineError;
use crate::engine::types::Document;
use async_trait::async_trait;

#[async_trait]
pub trait NetworkOps: Send + Sync {
    async fn list_networks(&self) -> Result<Vec<Document>, EngineError>;
}

#[async_trait]
pub trait VolumeOps: Send + Sync {
    async fn list_volumes(&self) -> Result<Vec<Document>, EngineError>;
}
