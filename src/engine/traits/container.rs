// ABOUTME: Container operations trait for engine clients.
// ABOUTME: List, start, stop, restart, remove, inspect, logs, and stats sampling.

use crate::engine::error::EngineError;
use crate::engine::types::{ContainerDescriptor, Document};
use async_trait::async_trait;

/// Container lifecycle and observation operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// List containers. Stopped containers are included when `all` is set.
    ///
    /// Descriptors come back without an `endpoint`; the owning connection
    /// fills it in.
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerDescriptor>, EngineError>;

    /// Full inspect document for a container.
    async fn inspect_container(&self, id: &str) -> Result<Document, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;

    async fn restart_container(&self, id: &str) -> Result<(), EngineError>;

    /// Remove a container. Without `force` a running container is a conflict.
    async fn remove_container(&self, id: &str, force: bool) -> Result<(), EngineError>;

    /// Last `tail` lines of combined stdout and stderr.
    async fn container_logs(&self, id: &str, tail: u64) -> Result<String, EngineError>;

    /// One raw stats sample, carrying both the current and previous CPU readings.
    async fn container_stats(&self, id: &str) -> Result<Document, EngineError>;
}
