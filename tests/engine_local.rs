// ABOUTME: Smoke tests against a local Docker daemon through the bollard client.
// ABOUTME: Skipped when no daemon socket is reachable.

use dockfleet::compose::ComposeRunner;
use dockfleet::config::{DEFAULT_SOCKET, EndpointConfig};
use dockfleet::endpoint::{Endpoint, ErrorKind};
use dockfleet::registry::EndpointRegistry;
use std::path::Path;

/// Get a local endpoint, skipping the test if no daemon answers.
async fn local_endpoint() -> Option<Endpoint> {
    if !Path::new(DEFAULT_SOCKET).exists() {
        return None;
    }
    let config = EndpointConfig::socket(DEFAULT_SOCKET).with_name("local");
    let endpoint = Endpoint::connect(config, ComposeRunner::default()).ok()?;
    endpoint.ping().await.ok()?;
    Some(endpoint)
}

/// Skip test if no local daemon is available.
macro_rules! require_engine {
    () => {
        match local_endpoint().await {
            Some(endpoint) => endpoint,
            None => {
                eprintln!("Skipping test: no local Docker daemon found");
                return;
            }
        }
    };
}

#[tokio::test]
async fn ping_reports_a_version() {
    let endpoint = require_engine!();

    let version = endpoint.ping().await.expect("ping should succeed");

    assert!(!version.version.is_empty(), "engine version should not be empty");
    assert!(!version.api_version.is_empty());
}

#[tokio::test]
async fn listings_succeed() {
    let endpoint = require_engine!();

    let containers = endpoint.list_containers(true).await.expect("list containers");
    assert!(containers.iter().all(|c| c.endpoint.as_deref() == Some("local")));

    endpoint.list_images().await.expect("list images");
    let networks = endpoint.list_networks().await.expect("list networks");
    assert!(
        networks.iter().any(|n| n.get("Name").and_then(|v| v.as_str()) == Some("bridge")),
        "default bridge network should exist"
    );
    endpoint.list_volumes().await.expect("list volumes");
}

#[tokio::test]
async fn unknown_container_is_not_found() {
    let endpoint = require_engine!();

    let err = endpoint
        .inspect("dockfleet-definitely-missing")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn registry_fans_out_to_the_local_daemon() {
    let _ = require_engine!();

    let registry = EndpointRegistry::default();
    registry
        .add(EndpointConfig::socket(DEFAULT_SOCKET).with_name("local"))
        .expect("add local endpoint");

    let status = registry.status().await;
    assert_eq!(status.items.len(), 1);
    assert!(!status.diagnostics.has_failures());
}
