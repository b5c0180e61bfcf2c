// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory engine and endpoint builders for integration tests.

use async_trait::async_trait;
use dockfleet::compose::ComposeRunner;
use dockfleet::config::EndpointConfig;
use dockfleet::endpoint::Endpoint;
use dockfleet::engine::{
    ContainerDescriptor, ContainerOps, Document, EngineError, EngineVersion, ImageOps,
    NetworkOps, RuntimeInfo, VolumeOps, into_document,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("dockfleet=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// In-memory engine. Every call is recorded; a failing engine fails every call.
#[derive(Default)]
pub struct MockEngine {
    containers: Mutex<Vec<ContainerDescriptor>>,
    images: Mutex<Vec<Document>>,
    stats: Mutex<Document>,
    calls: Mutex<Vec<String>>,
    failure: Option<EngineError>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, id: &str, name: &str, running: bool) -> Self {
        self.containers.lock().push(container(id, name, running));
        self
    }

    pub fn with_image(self, id: &str, tag: &str) -> Self {
        self.images
            .lock()
            .push(into_document(json!({ "Id": id, "RepoTags": [tag] })));
        self
    }

    pub fn with_stats(self, sample: serde_json::Value) -> Self {
        *self.stats.lock() = into_document(sample);
        self
    }

    pub fn failing(mut self, error: EngineError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn container(&self, identifier: &str) -> Option<ContainerDescriptor> {
        self.containers
            .lock()
            .iter()
            .find(|c| c.matches(identifier))
            .cloned()
    }

    async fn call(&self, call: String) -> Result<(), EngineError> {
        self.calls.lock().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn set_running(&self, id: &str, running: bool) -> Result<(), EngineError> {
        let mut containers = self.containers.lock();
        let container = containers
            .iter_mut()
            .find(|c| c.matches(id))
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {id}")))?;
        if container.is_running() == running {
            return Err(EngineError::Conflict(format!(
                "{id}: already in the requested state"
            )));
        }
        container.state = if running { "running" } else { "exited" }.to_string();
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for MockEngine {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerDescriptor>, EngineError> {
        self.call(format!("list all={all}")).await?;
        Ok(self
            .containers
            .lock()
            .iter()
            .filter(|c| all || c.is_running())
            .cloned()
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<Document, EngineError> {
        self.call(format!("inspect {id}")).await?;
        let container = self
            .container(id)
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {id}")))?;
        Ok(into_document(json!({
            "Id": container.id,
            "Name": container.name,
            "State": { "Running": container.is_running() },
        })))
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.call(format!("start {id}")).await?;
        self.set_running(id, true)
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.call(format!("stop {id}")).await?;
        self.set_running(id, false)
    }

    async fn restart_container(&self, id: &str) -> Result<(), EngineError> {
        self.call(format!("restart {id}")).await?;
        let _ = self.set_running(id, false);
        self.set_running(id, true)
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.call(format!("remove {id} force={force}")).await?;
        let mut containers = self.containers.lock();
        let index = containers
            .iter()
            .position(|c| c.matches(id))
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {id}")))?;
        if containers[index].is_running() {
            return Err(EngineError::Conflict(format!(
                "cannot remove running container {id}"
            )));
        }
        containers.remove(index);
        Ok(())
    }

    async fn container_logs(&self, id: &str, tail: u64) -> Result<String, EngineError> {
        self.call(format!("logs {id} tail={tail}")).await?;
        Ok(format!("log line from {id}\n"))
    }

    async fn container_stats(&self, id: &str) -> Result<Document, EngineError> {
        self.call(format!("stats {id}")).await?;
        Ok(self.stats.lock().clone())
    }
}

#[async_trait]
impl ImageOps for MockEngine {
    async fn list_images(&self) -> Result<Vec<Document>, EngineError> {
        self.call("images".to_string()).await?;
        Ok(self.images.lock().clone())
    }

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError> {
        self.call(format!("pull {reference}")).await?;
        self.images
            .lock()
            .push(into_document(json!({ "Id": reference, "RepoTags": [reference] })));
        Ok(())
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.call(format!("rmi {id} force={force}")).await?;
        let mut images = self.images.lock();
        let before = images.len();
        images.retain(|image| image.get("Id").and_then(|v| v.as_str()) != Some(id));
        if images.len() == before {
            return Err(EngineError::NotFound(format!("No such image: {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkOps for MockEngine {
    async fn list_networks(&self) -> Result<Vec<Document>, EngineError> {
        self.call("networks".to_string()).await?;
        Ok(vec![into_document(
            json!({ "Id": "n1", "Name": "bridge", "Driver": "bridge" }),
        )])
    }
}

#[async_trait]
impl VolumeOps for MockEngine {
    async fn list_volumes(&self) -> Result<Vec<Document>, EngineError> {
        self.call("volumes".to_string()).await?;
        Ok(Vec::new())
    }
}

#[async_trait]
impl RuntimeInfo for MockEngine {
    async fn ping(&self) -> Result<EngineVersion, EngineError> {
        self.call("ping".to_string()).await?;
        Ok(EngineVersion {
            version: "27.3.1".to_string(),
            api_version: "1.47".to_string(),
        })
    }
}

/// A container descriptor as an engine would report it.
pub fn container(id: &str, name: &str, running: bool) -> ContainerDescriptor {
    ContainerDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        image: "nginx:latest".to_string(),
        state: if running { "running" } else { "exited" }.to_string(),
        status: if running { "Up 2 minutes" } else { "Exited (0)" }.to_string(),
        ports: Vec::new(),
        created: None,
        endpoint: None,
    }
}

/// Endpoint `name` backed by `engine`, with the default Compose runner.
#[allow(dead_code)]
pub fn mock_endpoint(name: &str, engine: MockEngine) -> (Endpoint, Arc<MockEngine>) {
    mock_endpoint_with_compose(name, engine, ComposeRunner::default())
}

#[allow(dead_code)]
pub fn mock_endpoint_with_compose(
    name: &str,
    engine: MockEngine,
    compose: ComposeRunner,
) -> (Endpoint, Arc<MockEngine>) {
    let engine = Arc::new(engine);
    let config = EndpointConfig::tcp(format!("{name}.internal"), 2375).with_name(name);
    let endpoint = Endpoint::with_client(config, engine.clone(), compose);
    (endpoint, engine)
}
