// ABOUTME: Bollard-based engine client.
// ABOUTME: Connects over unix socket, plain TCP, or TCP with TLS, and maps engine errors.

use crate::config::{EndpointConfig, Scheme, Target};
use crate::endpoint::{ConfigSnafu, EndpointError, EngineSnafu};
use crate::engine::error::EngineError;
use crate::engine::traits::{ContainerOps, ImageOps, NetworkOps, RuntimeInfo, VolumeOps};
use crate::engine::types::{ContainerDescriptor, Document, EngineVersion, PortMapping, into_document};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::query_parameters::{
    CreateImageOptions, InspectContainerOptions, ListContainersOptions, ListImagesOptions,
    ListNetworksOptions, ListVolumesOptions, LogsOptions, RemoveContainerOptions,
    RemoveImageOptions, RestartContainerOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use chrono::DateTime;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use snafu::ResultExt;

/// Client-side request timeout, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_engine_error(e: bollard::errors::Error, subject: &str) -> EngineError {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(or_subject(message, subject)),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message,
        } => EngineError::Conflict(or_subject(message, subject)),
        // 304: start of a running container, stop of a stopped one
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        } => EngineError::Conflict(format!("{}: already in the requested state", subject)),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Engine(format!("{} (status {})", message, status_code)),
        other => EngineError::Transport(other.to_string()),
    }
}

fn or_subject(message: String, subject: &str) -> String {
    if message.is_empty() {
        subject.to_string()
    } else {
        message
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<Document, EngineError> {
    serde_json::to_value(value)
        .map(into_document)
        .map_err(|e| EngineError::Engine(format!("failed to encode engine response: {}", e)))
}

/// Split `repo[:tag]` for the create-image call. Digests pass through untouched.
fn split_reference(reference: &str) -> (String, Option<String>) {
    if reference.contains('@') {
        return (reference.to_string(), None);
    }
    let last_segment = reference.rsplit('/').next().unwrap_or(reference);
    match last_segment.rfind(':') {
        Some(pos) => {
            let split_at = reference.len() - last_segment.len() + pos;
            (
                reference[..split_at].to_string(),
                Some(reference[split_at + 1..].to_string()),
            )
        }
        None => (reference.to_string(), Some("latest".to_string())),
    }
}

// =============================================================================
// BollardEngine
// =============================================================================

/// Engine client backed by bollard.
pub struct BollardEngine {
    client: Docker,
}

impl BollardEngine {
    /// Wrap an existing bollard client.
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Build a client for the configured target.
    ///
    /// Unix sockets and plain TCP connect lazily, so success here does not
    /// mean the daemon is reachable. TLS material is read at this point.
    pub fn connect(config: &EndpointConfig) -> Result<Self, EndpointError> {
        let endpoint = config.resolved_name();

        let client = match (config.target(), config.tls()) {
            (Target::Socket(path), _) => Docker::connect_with_unix(
                &path.to_string_lossy(),
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            (
                Target::Tcp {
                    scheme: Scheme::Http,
                    ..
                },
                Some(_),
            ) => {
                return Err(EndpointError::Config {
                    source: crate::config::ConfigError::TlsOverHttp { endpoint },
                });
            }
            (Target::Tcp { .. }, Some(tls)) => {
                tls.check_readable().context(ConfigSnafu)?;
                Docker::connect_with_ssl(
                    &config.docker_host(),
                    &tls.key,
                    &tls.cert,
                    &tls.ca,
                    CONNECT_TIMEOUT_SECS,
                    bollard::API_DEFAULT_VERSION,
                )
            }
            (
                Target::Tcp {
                    scheme: Scheme::Https,
                    ..
                },
                None,
            ) => {
                return Err(EndpointError::Config {
                    source: crate::config::ConfigError::TlsRequired { endpoint },
                });
            }
            (Target::Tcp { .. }, None) => Docker::connect_with_http(
                &config.docker_host(),
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .map_err(|e| EngineError::Transport(e.to_string()))
        .context(EngineSnafu {
            endpoint: endpoint.clone(),
        })?;

        tracing::debug!(endpoint = %endpoint, host = %config.docker_host(), "engine client created");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl RuntimeInfo for BollardEngine {
    async fn ping(&self) -> Result<EngineVersion, EngineError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| map_engine_error(e, "version"))?;

        Ok(EngineVersion {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ContainerOps for BollardEngine {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerDescriptor>, EngineError> {
        let opts = ListContainersOptions {
            all,
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| map_engine_error(e, "containers"))?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();

                let ports = c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| PortMapping {
                        private_port: p.private_port,
                        public_port: p.public_port,
                        protocol: p
                            .typ
                            .map(|t| format!("{:?}", t).to_lowercase())
                            .unwrap_or_else(|| "tcp".to_string()),
                        ip: p.ip.filter(|ip| !ip.is_empty()),
                    })
                    .collect();

                ContainerDescriptor {
                    id: c.id.unwrap_or_default(),
                    name,
                    image: c.image.unwrap_or_default(),
                    state: c
                        .state
                        .map(|s| format!("{:?}", s).to_lowercase())
                        .unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                    ports,
                    created: c.created.and_then(|secs| DateTime::from_timestamp(secs, 0)),
                    endpoint: None,
                }
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<Document, EngineError> {
        let details = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_engine_error(e, id))?;

        let mut doc = to_document(&details)?;
        if let Some(Value::String(name)) = doc.get_mut("Name") {
            *name = name.trim_start_matches('/').to_string();
        }
        Ok(doc)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.client
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| map_engine_error(e, id))
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.client
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(|e| map_engine_error(e, id))
    }

    async fn restart_container(&self, id: &str) -> Result<(), EngineError> {
        self.client
            .restart_container(id, None::<RestartContainerOptions>)
            .await
            .map_err(|e| map_engine_error(e, id))
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), EngineError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id, Some(opts))
            .await
            .map_err(|e| map_engine_error(e, id))
    }

    async fn container_logs(&self, id: &str, tail: u64) -> Result<String, EngineError> {
        let opts = LogsOptions {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = Box::pin(self.client.logs(id, Some(opts)));
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item.map_err(|e| map_engine_error(e, id))? {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::StdIn { message }
                | LogOutput::Console { message } => {
                    text.push_str(&String::from_utf8_lossy(&message));
                }
            }
        }
        Ok(text)
    }

    async fn container_stats(&self, id: &str) -> Result<Document, EngineError> {
        let opts = StatsOptions {
            stream: false,
            one_shot: false,
            ..Default::default()
        };

        let mut stream = Box::pin(self.client.stats(id, Some(opts)));
        match stream.next().await {
            Some(Ok(sample)) => to_document(&sample),
            Some(Err(e)) => Err(map_engine_error(e, id)),
            None => Err(EngineError::NotFound(id.to_string())),
        }
    }
}

#[async_trait]
impl ImageOps for BollardEngine {
    async fn list_images(&self) -> Result<Vec<Document>, EngineError> {
        let images = self
            .client
            .list_images(None::<ListImagesOptions>)
            .await
            .map_err(|e| map_engine_error(e, "images"))?;

        images.iter().map(to_document).collect()
    }

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError> {
        let (from_image, tag) = split_reference(reference);
        let opts = CreateImageOptions {
            from_image: Some(from_image),
            tag,
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| map_engine_error(e, reference))?;
        }

        Ok(())
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<(), EngineError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(id, Some(opts), None)
            .await
            .map_err(|e| map_engine_error(e, id))?;

        Ok(())
    }
}

#[async_trait]
impl NetworkOps for BollardEngine {
    async fn list_networks(&self) -> Result<Vec<Document>, EngineError> {
        let networks = self
            .client
            .list_networks(None::<ListNetworksOptions>)
            .await
            .map_err(|e| map_engine_error(e, "networks"))?;

        networks.iter().map(to_document).collect()
    }
}

#[async_trait]
impl VolumeOps for BollardEngine {
    async fn list_volumes(&self) -> Result<Vec<Document>, EngineError> {
        let response = self
            .client
            .list_volumes(None::<ListVolumesOptions>)
            .await
            .map_err(|e| map_engine_error(e, "volumes"))?;

        response
            .volumes
            .unwrap_or_default()
            .iter()
            .map(to_document)
            .collect()
    }
}
