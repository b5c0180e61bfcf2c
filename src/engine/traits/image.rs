// ABOUTME: Image operations trait for engine clients.
// ABOUTME: List, pull, and remove images.

use crate::engine::error::EngineError;
use crate::engine::types::Document;
use async_trait::async_trait;

/// Image operations: list, pull, remove.
#[async_trait]
pub trait ImageOps: Send + Sync {
    async fn list_images(&self) -> Result<Vec<Document>, EngineError>;

    /// Pull an image from its registry, waiting for the pull to finish.
    async fn pull_image(&self, reference: &str) -> Result<(), EngineError>;

    async fn remove_image(&self, id: &str, force: bool) -> Result<(), EngineError>;
}
