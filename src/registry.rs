// ABOUTME: Registry of named endpoints with fan-out and container auto-detection.
// ABOUTME: One failing endpoint never hides the others; failures are logged and collected.

use crate::compose::ComposeRunner;
use crate::config::EndpointConfig;
use crate::diagnostics::{Aggregate, Diagnostics};
use crate::endpoint::{
    ContainerNotFoundSnafu, Endpoint, EndpointError, NoEndpointsSnafu, TimeoutSnafu,
    UnknownEndpointSnafu,
};
use crate::engine::{ContainerDescriptor, Document, EngineVersion};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use snafu::OptionExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on each per-endpoint call during fan-out.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every endpoint in a registry.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Bound on each per-endpoint call during fan-out. A call that exceeds
    /// it is treated like any other endpoint failure.
    pub timeout: Duration,
    /// Runner handed to endpoints created by [`EndpointRegistry::add`].
    pub compose: ComposeRunner,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
            compose: ComposeRunner::default(),
        }
    }
}

/// A reachable endpoint and the engine version it reported.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub target: String,
    #[serde(flatten)]
    pub version: EngineVersion,
}

/// Named set of endpoints, kept in registration order.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: RwLock<Vec<Arc<Endpoint>>>,
    options: RegistryOptions,
}

impl EndpointRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            endpoints: RwLock::new(Vec::new()),
            options,
        }
    }

    /// Connect to `config` and register it under its resolved name.
    ///
    /// An endpoint already registered under that name is replaced.
    pub fn add(&self, config: EndpointConfig) -> Result<String, EndpointError> {
        let endpoint = Endpoint::connect(config, self.options.compose.clone())?;
        let name = endpoint.name().to_string();
        self.insert(endpoint);
        Ok(name)
    }

    /// Register an already-built endpoint, returning the one it replaced.
    ///
    /// A replaced endpoint keeps its position in the registration order.
    pub fn insert(&self, endpoint: Endpoint) -> Option<Arc<Endpoint>> {
        let endpoint = Arc::new(endpoint);
        let mut endpoints = self.endpoints.write();

        match endpoints.iter_mut().find(|e| e.name() == endpoint.name()) {
            Some(slot) => {
                tracing::warn!("replacing existing endpoint {}", endpoint.name());
                Some(std::mem::replace(slot, endpoint))
            }
            None => {
                tracing::info!("registered endpoint {}", endpoint.name());
                endpoints.push(endpoint);
                None
            }
        }
    }

    /// Unregister `name`. Returns whether it was registered.
    ///
    /// Calls already running against the endpoint keep their own handle.
    pub fn remove(&self, name: &str) -> bool {
        let mut endpoints = self.endpoints.write();
        let before = endpoints.len();
        endpoints.retain(|e| e.name() != name);
        let removed = endpoints.len() != before;
        if removed {
            tracing::info!("removed endpoint {}", name);
        }
        removed
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.endpoints
            .read()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints
            .read()
            .iter()
            .find(|e| e.name() == name)
            .cloned()
    }

    /// Like [`get`](Self::get), but absence is an error.
    pub fn require(&self, name: &str) -> Result<Arc<Endpoint>, EndpointError> {
        self.get(name).context(UnknownEndpointSnafu { name })
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }

    /// For callers that need at least one endpoint to query.
    pub fn ensure_not_empty(&self) -> Result<(), EndpointError> {
        if self.is_empty() {
            return NoEndpointsSnafu.fail();
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints.read().clone()
    }

    /// Run `op` against every endpoint concurrently.
    ///
    /// Successful results come back in registration order. Failures,
    /// including timeouts, are recorded in the diagnostics instead.
    async fn fan_out<T, F, Fut>(&self, op: F) -> (Vec<(String, T)>, Diagnostics)
    where
        F: Fn(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = Result<T, EndpointError>>,
    {
        let timeout = self.options.timeout;
        let calls = self.snapshot().into_iter().map(|endpoint| {
            let name = endpoint.name().to_string();
            let call = op(endpoint);
            async move {
                let result = match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => TimeoutSnafu {
                        endpoint: name.clone(),
                        timeout,
                    }
                    .fail(),
                };
                (name, result)
            }
        });

        let mut results = Vec::new();
        let mut diagnostics = Diagnostics::default();
        for (name, result) in join_all(calls).await {
            match result {
                Ok(value) => results.push((name, value)),
                Err(e) => diagnostics.record(&name, &e),
            }
        }
        (results, diagnostics)
    }

    /// Containers from every endpoint, concatenated.
    pub async fn list_all_containers(
        &self,
        include_stopped: bool,
    ) -> Aggregate<Vec<ContainerDescriptor>> {
        let (results, diagnostics) = self
            .fan_out(move |endpoint| async move { endpoint.list_containers(include_stopped).await })
            .await;

        Aggregate {
            items: results.into_iter().flat_map(|(_, items)| items).collect(),
            diagnostics,
        }
    }

    /// Images per endpoint name.
    pub async fn list_all_images(&self) -> Aggregate<BTreeMap<String, Vec<Document>>> {
        let (results, diagnostics) = self
            .fan_out(|endpoint| async move { endpoint.list_images().await })
            .await;
        grouped(results, diagnostics)
    }

    /// Networks per endpoint name.
    pub async fn list_all_networks(&self) -> Aggregate<BTreeMap<String, Vec<Document>>> {
        let (results, diagnostics) = self
            .fan_out(|endpoint| async move { endpoint.list_networks().await })
            .await;
        grouped(results, diagnostics)
    }

    /// Volumes per endpoint name.
    pub async fn list_all_volumes(&self) -> Aggregate<BTreeMap<String, Vec<Document>>> {
        let (results, diagnostics) = self
            .fan_out(|endpoint| async move { endpoint.list_volumes().await })
            .await;
        grouped(results, diagnostics)
    }

    /// Ping every endpoint.
    pub async fn status(&self) -> Aggregate<Vec<EndpointStatus>> {
        let (results, diagnostics) = self
            .fan_out(|endpoint| async move {
                let version = endpoint.ping().await;
                version.map(|version| EndpointStatus {
                    name: endpoint.name().to_string(),
                    target: endpoint.config().target().to_string(),
                    version,
                })
            })
            .await;

        Aggregate {
            items: results.into_iter().map(|(_, status)| status).collect(),
            diagnostics,
        }
    }

    /// Find the endpoint that has a container with this ID or name.
    ///
    /// Stopped containers count. When several endpoints match, the one
    /// registered first wins and the others are logged. Endpoints that fail
    /// to list are skipped.
    pub async fn find_container(&self, identifier: &str) -> Option<Arc<Endpoint>> {
        let (results, _diagnostics) = self
            .fan_out(|endpoint| async move {
                let containers = endpoint.list_containers(true).await;
                containers.map(|containers| (endpoint, containers))
            })
            .await;

        let mut matches = results
            .into_iter()
            .filter(|(_, (_, containers))| containers.iter().any(|c| c.matches(identifier)))
            .map(|(_, (endpoint, _))| endpoint);

        let found = matches.next()?;
        let others: Vec<String> = matches.map(|e| e.name().to_string()).collect();
        if !others.is_empty() {
            tracing::warn!(
                "container {} also exists on {}; using {}",
                identifier,
                others.join(", "),
                found.name()
            );
        }
        tracing::debug!("container {} found on {}", identifier, found.name());
        Some(found)
    }

    /// Endpoint for a container operation.
    ///
    /// An explicit endpoint name must be registered; without one the
    /// container is searched for across all endpoints.
    pub async fn resolve(
        &self,
        endpoint: Option<&str>,
        identifier: &str,
    ) -> Result<Arc<Endpoint>, EndpointError> {
        match endpoint {
            Some(name) => self.require(name),
            None => self
                .find_container(identifier)
                .await
                .context(ContainerNotFoundSnafu { identifier }),
        }
    }
}

fn grouped<T>(
    results: Vec<(String, Vec<T>)>,
    diagnostics: Diagnostics,
) -> Aggregate<BTreeMap<String, Vec<T>>> {
    Aggregate {
        items: results.into_iter().collect(),
        diagnostics,
    }
}
