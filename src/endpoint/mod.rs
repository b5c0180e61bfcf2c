// ABOUTME: Endpoint connection: one configured engine and its live client.
// ABOUTME: Exposes container, image, network, volume, and stack operations scoped to that engine.

mod error;

pub use error::{
    ComposeSnafu, ConfigSnafu, ContainerNotFoundSnafu, EndpointError, EngineSnafu, ErrorKind,
    NoEndpointsSnafu, TimeoutSnafu, UnknownEndpointSnafu,
};

use crate::compose::{ComposeOutput, ComposeRunner};
use crate::config::EndpointConfig;
use crate::engine::{
    BollardEngine, ContainerDescriptor, ContainerStats, Document, EngineApi, EngineVersion,
};
use serde::Serialize;
use snafu::ResultExt;
use std::sync::Arc;

/// Lines of log output returned when the caller does not ask for a count.
pub const DEFAULT_LOG_TAIL: u64 = 100;

/// One engine endpoint: its configuration, resolved name, and client handle.
///
/// The client is bound to the configuration for the connection's whole
/// lifetime; to change either, build a new `Endpoint` and replace this one.
pub struct Endpoint {
    name: String,
    config: EndpointConfig,
    client: Arc<dyn EngineApi>,
    compose: ComposeRunner,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("target", &self.config.target())
            .finish()
    }
}

/// What an endpoint points at, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSummary {
    pub name: String,
    pub target: String,
    pub tls: bool,
}

/// Result of a Compose operation, naming the endpoint it ran against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeOutcome {
    pub endpoint: String,
    pub project: Option<String>,
    #[serde(flatten)]
    pub output: ComposeOutput,
}

impl Endpoint {
    /// Connect to the configured engine through bollard.
    pub fn connect(config: EndpointConfig, compose: ComposeRunner) -> Result<Self, EndpointError> {
        let client = BollardEngine::connect(&config)?;
        Ok(Self::with_client(config, Arc::new(client), compose))
    }

    /// Build an endpoint around an existing client.
    pub fn with_client(
        config: EndpointConfig,
        client: Arc<dyn EngineApi>,
        compose: ComposeRunner,
    ) -> Self {
        Self {
            name: config.resolved_name(),
            config,
            client,
            compose,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn describe(&self) -> EndpointSummary {
        EndpointSummary {
            name: self.name.clone(),
            target: self.config.target().to_string(),
            tls: self.config.tls().is_some(),
        }
    }

    fn engine_context(&self) -> EngineSnafu<String> {
        EngineSnafu {
            endpoint: self.name.clone(),
        }
    }

    pub async fn ping(&self) -> Result<EngineVersion, EndpointError> {
        self.client.ping().await.context(self.engine_context())
    }

    // =========================================================================
    // Containers
    // =========================================================================

    /// Containers on this endpoint, each tagged with the endpoint name.
    pub async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerDescriptor>, EndpointError> {
        tracing::debug!(endpoint = %self.name, include_stopped, "listing containers");
        let mut containers = self
            .client
            .list_containers(include_stopped)
            .await
            .context(self.engine_context())?;

        for container in &mut containers {
            container.endpoint = Some(self.name.clone());
        }
        Ok(containers)
    }

    pub async fn inspect(&self, id: &str) -> Result<Document, EndpointError> {
        self.client
            .inspect_container(id)
            .await
            .context(self.engine_context())
    }

    pub async fn start(&self, id: &str) -> Result<(), EndpointError> {
        tracing::info!(endpoint = %self.name, container = id, "starting container");
        self.client
            .start_container(id)
            .await
            .context(self.engine_context())
    }

    pub async fn stop(&self, id: &str) -> Result<(), EndpointError> {
        tracing::info!(endpoint = %self.name, container = id, "stopping container");
        self.client
            .stop_container(id)
            .await
            .context(self.engine_context())
    }

    pub async fn restart(&self, id: &str) -> Result<(), EndpointError> {
        tracing::info!(endpoint = %self.name, container = id, "restarting container");
        self.client
            .restart_container(id)
            .await
            .context(self.engine_context())
    }

    /// Remove a container.
    ///
    /// Without `force`, removing a running container is a `Conflict`. With
    /// `force`, the container is stopped first and then removed.
    pub async fn remove(&self, id: &str, force: bool) -> Result<(), EndpointError> {
        tracing::info!(endpoint = %self.name, container = id, force, "removing container");
        if force {
            match self.client.stop_container(id).await {
                Ok(()) => {}
                // Already stopped
                Err(e) if e.is_conflict() => {}
                Err(e) => return Err(e).context(self.engine_context()),
            }
        }
        self.client
            .remove_container(id, force)
            .await
            .context(self.engine_context())
    }

    /// Combined stdout and stderr, last `tail` lines (default 100).
    pub async fn logs(&self, id: &str, tail: Option<u64>) -> Result<String, EndpointError> {
        self.client
            .container_logs(id, tail.unwrap_or(DEFAULT_LOG_TAIL))
            .await
            .context(self.engine_context())
    }

    pub async fn stats(&self, id: &str) -> Result<ContainerStats, EndpointError> {
        let sample = self
            .client
            .container_stats(id)
            .await
            .context(self.engine_context())?;
        Ok(ContainerStats::from_sample(&sample))
    }

    // =========================================================================
    // Images, networks, volumes
    // =========================================================================

    pub async fn list_images(&self) -> Result<Vec<Document>, EndpointError> {
        self.client.list_images().await.context(self.engine_context())
    }

    pub async fn pull_image(&self, reference: &str) -> Result<(), EndpointError> {
        tracing::info!(endpoint = %self.name, image = reference, "pulling image");
        self.client
            .pull_image(reference)
            .await
            .context(self.engine_context())
    }

    pub async fn remove_image(&self, id: &str, force: bool) -> Result<(), EndpointError> {
        tracing::info!(endpoint = %self.name, image = id, force, "removing image");
        self.client
            .remove_image(id, force)
            .await
            .context(self.engine_context())
    }

    pub async fn list_networks(&self) -> Result<Vec<Document>, EndpointError> {
        self.client
            .list_networks()
            .await
            .context(self.engine_context())
    }

    pub async fn list_volumes(&self) -> Result<Vec<Document>, EndpointError> {
        self.client
            .list_volumes()
            .await
            .context(self.engine_context())
    }

    // =========================================================================
    // Compose stacks
    // =========================================================================

    /// Deploy a stack from YAML text against this endpoint.
    pub async fn deploy_compose(
        &self,
        yaml: &str,
        project: Option<&str>,
    ) -> Result<ComposeOutcome, EndpointError> {
        let output = self
            .compose
            .deploy(&self.config.engine_env(), yaml, project)
            .await
            .context(ComposeSnafu {
                endpoint: self.name.clone(),
                action: "deploy",
            })?;

        Ok(ComposeOutcome {
            endpoint: self.name.clone(),
            project: project.map(str::to_string),
            output,
        })
    }

    /// Tear down a stack and its volumes on this endpoint.
    pub async fn teardown_compose(&self, project: &str) -> Result<ComposeOutcome, EndpointError> {
        let output = self
            .compose
            .teardown(&self.config.engine_env(), project)
            .await
            .context(ComposeSnafu {
                endpoint: self.name.clone(),
                action: "teardown",
            })?;

        Ok(ComposeOutcome {
            endpoint: self.name.clone(),
            project: Some(project.to_string()),
            output,
        })
    }
}
