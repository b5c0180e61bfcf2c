// ABOUTME: Integration tests for the endpoint registry.
// ABOUTME: Registration order, fan-out failure isolation, timeouts, and container auto-detection.

mod support;

use dockfleet::config::{EndpointConfig, Scheme, TlsMaterial};
use dockfleet::endpoint::ErrorKind;
use dockfleet::engine::EngineError;
use dockfleet::registry::{EndpointRegistry, RegistryOptions};
use std::sync::Arc;
use std::time::Duration;
use support::{MockEngine, mock_endpoint};

fn registry_with(endpoints: Vec<(&str, MockEngine)>) -> EndpointRegistry {
    let registry = EndpointRegistry::default();
    for (name, engine) in endpoints {
        registry.insert(mock_endpoint(name, engine).0);
    }
    registry
}

fn refused() -> EngineError {
    EngineError::Transport("connection refused".to_string())
}

// =============================================================================
// Membership
// =============================================================================

mod membership {
    use super::*;

    #[test]
    fn names_follow_registration_order() {
        let registry = registry_with(vec![
            ("prod", MockEngine::new()),
            ("staging", MockEngine::new()),
            ("edge", MockEngine::new()),
        ]);

        assert_eq!(registry.names(), vec!["prod", "staging", "edge"]);
        assert_eq!(registry.len(), 3);

        assert!(registry.remove("staging"));
        assert!(!registry.remove("staging"));
        assert_eq!(registry.names(), vec!["prod", "edge"]);
    }

    #[tokio::test]
    async fn replacing_an_endpoint_keeps_its_position() {
        let registry = registry_with(vec![
            ("prod", MockEngine::new()),
            ("staging", MockEngine::new()),
        ]);

        let (replacement, _) =
            mock_endpoint("prod", MockEngine::new().with_container("c1", "web", true));
        let previous = registry.insert(replacement);

        assert!(previous.is_some());
        assert_eq!(registry.names(), vec!["prod", "staging"]);
        let prod = registry.require("prod").unwrap();
        assert_eq!(prod.list_containers(false).await.unwrap().len(), 1);
    }

    #[test]
    fn unknown_endpoint_is_not_found() {
        let registry = registry_with(vec![("prod", MockEngine::new())]);

        assert!(registry.get("nope").is_none());
        let err = registry.require("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn empty_registry_reports_no_endpoints() {
        let registry = EndpointRegistry::default();
        assert!(registry.is_empty());
        let err = registry.ensure_not_empty().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn add_rejects_https_without_tls_material() {
        let registry = EndpointRegistry::default();
        let config = EndpointConfig::tcp("secure.internal", 2376)
            .with_name("secure")
            .with_scheme(Scheme::Https);

        let err = registry.add(config).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert!(registry.is_empty());
    }

    #[test]
    fn add_rejects_unreadable_tls_files() {
        let certs = tempfile::tempdir().unwrap();
        let registry = EndpointRegistry::default();
        let config = EndpointConfig::tcp("secure.internal", 2376)
            .with_name("secure")
            .with_tls(TlsMaterial::from_cert_dir(certs.path()));

        let err = registry.add(config).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert!(err.to_string().contains("ca.pem"), "{err}");
        assert!(registry.is_empty());
    }

    #[test]
    fn add_rejects_tls_material_over_plain_http() {
        let certs = tempfile::tempdir().unwrap();
        let registry = EndpointRegistry::default();
        let config = EndpointConfig::tcp("secure.internal", 2376)
            .with_name("secure")
            .with_tls(TlsMaterial::from_cert_dir(certs.path()))
            .with_scheme(Scheme::Http);

        let err = registry.add(config).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert!(err.to_string().contains("scheme is http"), "{err}");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn add_registers_under_the_derived_name() {
        let registry = EndpointRegistry::default();
        let name = registry
            .add(EndpointConfig::tcp("10.0.0.5", 2375))
            .unwrap();

        assert_eq!(name, "10.0.0.5");
        assert_eq!(registry.names(), vec!["10.0.0.5"]);
    }
}

// =============================================================================
// Fan-out
// =============================================================================

mod fan_out {
    use super::*;

    #[tokio::test]
    async fn failing_endpoint_does_not_hide_the_others() {
        support::init_tracing();
        let registry = registry_with(vec![
            ("prod", MockEngine::new().with_container("a1", "web", true)),
            ("broken", MockEngine::new().failing(refused())),
            ("staging", MockEngine::new().with_container("b1", "db", true)),
        ]);

        let result = registry.list_all_containers(false).await;

        let names: Vec<_> = result.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["web", "db"]);
        assert_eq!(result.items[0].endpoint.as_deref(), Some("prod"));
        assert_eq!(result.items[1].endpoint.as_deref(), Some("staging"));

        assert_eq!(
            result.diagnostics.failed_endpoints().collect::<Vec<_>>(),
            vec!["broken"]
        );
        assert_eq!(
            result.diagnostics.failures()[0].kind,
            ErrorKind::TransportFailure
        );
    }

    #[tokio::test]
    async fn stopped_containers_only_when_asked() {
        let registry = registry_with(vec![(
            "prod",
            MockEngine::new()
                .with_container("a1", "web", true)
                .with_container("a2", "batch", false),
        )]);

        assert_eq!(registry.list_all_containers(false).await.items.len(), 1);
        assert_eq!(registry.list_all_containers(true).await.items.len(), 2);
    }

    #[tokio::test]
    async fn slow_endpoint_times_out_without_blocking_the_rest() {
        let registry = EndpointRegistry::new(RegistryOptions {
            timeout: Duration::from_millis(50),
            ..Default::default()
        });
        registry.insert(
            mock_endpoint("slow", MockEngine::new().slow(Duration::from_secs(30))).0,
        );
        registry.insert(
            mock_endpoint("fast", MockEngine::new().with_container("f1", "api", true)).0,
        );

        let started = tokio::time::Instant::now();
        let result = registry.list_all_containers(true).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].endpoint.as_deref(), Some("fast"));

        let failure = &result.diagnostics.failures()[0];
        assert_eq!(failure.endpoint, "slow");
        assert_eq!(failure.kind, ErrorKind::TransportFailure);
        assert!(failure.message.contains("no response"));
    }

    #[tokio::test]
    async fn removal_during_a_fan_out_keeps_the_running_call() {
        let registry = Arc::new(registry_with(vec![
            (
                "slow",
                MockEngine::new()
                    .with_container("s1", "batch", true)
                    .slow(Duration::from_millis(200)),
            ),
            ("fast", MockEngine::new().with_container("f1", "api", true)),
        ]));

        let listing = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.list_all_containers(true).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(registry.remove("slow"));
        assert_eq!(registry.names(), vec!["fast"]);

        let result = listing.await.unwrap();
        let endpoints: Vec<_> = result
            .items
            .iter()
            .filter_map(|c| c.endpoint.as_deref())
            .collect();
        assert_eq!(endpoints, vec!["slow", "fast"]);
        assert!(!result.diagnostics.has_failures());

        let after = registry.list_all_containers(true).await;
        assert_eq!(after.items.len(), 1);
        assert_eq!(after.items[0].endpoint.as_deref(), Some("fast"));
    }

    #[tokio::test]
    async fn images_are_grouped_by_endpoint() {
        let registry = registry_with(vec![
            ("prod", MockEngine::new().with_image("sha256:aa", "nginx:1.27")),
            ("staging", MockEngine::new()),
            ("broken", MockEngine::new().failing(refused())),
        ]);

        let result = registry.list_all_images().await;

        assert_eq!(
            result.items.keys().collect::<Vec<_>>(),
            vec!["prod", "staging"]
        );
        assert_eq!(result.items["prod"].len(), 1);
        assert!(result.items["staging"].is_empty());
        assert!(result.diagnostics.has_failures());
    }

    #[tokio::test]
    async fn networks_and_volumes_fan_out() {
        let registry =
            registry_with(vec![("prod", MockEngine::new()), ("edge", MockEngine::new())]);

        let networks = registry.list_all_networks().await;
        assert_eq!(networks.items.len(), 2);
        assert_eq!(networks.items["edge"][0]["Name"], "bridge");

        let volumes = registry.list_all_volumes().await;
        assert_eq!(volumes.items.len(), 2);
        assert!(!volumes.diagnostics.has_failures());
    }

    #[tokio::test]
    async fn status_reports_versions_of_reachable_endpoints() {
        let registry = registry_with(vec![
            ("prod", MockEngine::new()),
            ("broken", MockEngine::new().failing(refused())),
        ]);

        let status = registry.status().await;

        assert_eq!(status.items.len(), 1);
        assert_eq!(status.items[0].name, "prod");
        assert_eq!(status.items[0].target, "http://prod.internal:2375");
        assert_eq!(status.items[0].version.api_version, "1.47");
        assert_eq!(
            status.diagnostics.failed_endpoints().collect::<Vec<_>>(),
            vec!["broken"]
        );
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_results() {
        let registry = EndpointRegistry::default();
        let result = registry.list_all_containers(true).await;
        assert!(result.items.is_empty());
        assert!(!result.diagnostics.has_failures());
    }
}

// =============================================================================
// Auto-detection
// =============================================================================

mod auto_detect {
    use super::*;

    #[tokio::test]
    async fn first_registered_match_wins() {
        let registry = registry_with(vec![
            ("prod", MockEngine::new().with_container("p1", "web", true)),
            ("staging", MockEngine::new().with_container("s1", "web", true)),
        ]);

        let found = registry.find_container("web").await.unwrap();
        assert_eq!(found.name(), "prod");

        let found = registry.find_container("s1").await.unwrap();
        assert_eq!(found.name(), "staging");
    }

    #[tokio::test]
    async fn stopped_containers_are_found() {
        let registry = registry_with(vec![(
            "prod",
            MockEngine::new().with_container("p1", "batch", false),
        )]);

        assert!(registry.find_container("batch").await.is_some());
    }

    #[tokio::test]
    async fn failing_endpoints_are_skipped() {
        let registry = registry_with(vec![
            ("broken", MockEngine::new().failing(refused())),
            ("staging", MockEngine::new().with_container("s1", "web", true)),
        ]);

        let found = registry.find_container("web").await.unwrap();
        assert_eq!(found.name(), "staging");
    }

    #[tokio::test]
    async fn missing_container_is_not_found() {
        let registry = registry_with(vec![("prod", MockEngine::new())]);

        assert!(registry.find_container("ghost").await.is_none());
        let err = registry.resolve(None, "ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn explicit_endpoint_skips_the_search() {
        let (prod, prod_engine) = mock_endpoint("prod", MockEngine::new());
        let (staging, _) = mock_endpoint("staging", MockEngine::new());
        let registry = EndpointRegistry::default();
        registry.insert(prod);
        registry.insert(staging);

        let endpoint = registry.resolve(Some("staging"), "web").await.unwrap();

        assert_eq!(endpoint.name(), "staging");
        assert!(prod_engine.calls().is_empty());

        let err = registry.resolve(Some("nope"), "web").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
