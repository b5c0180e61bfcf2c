// ABOUTME: Entry point for the dockfleet CLI application.
// ABOUTME: Builds the endpoint registry from settings and dispatches commands.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, ContainerTarget};
use dockfleet::config::Settings;
use dockfleet::endpoint::{ComposeOutcome, Endpoint, EndpointSummary};
use dockfleet::engine::{ContainerStats, Document};
use dockfleet::error::{Error, Result};
use dockfleet::output::{self, Output, OutputMode};
use dockfleet::registry::{EndpointRegistry, EndpointStatus, RegistryOptions};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let output = Output::new(if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Normal
    });

    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        let code = match &e {
            Error::Endpoint(inner) => inner.exit_code().unwrap_or(1),
            _ => 1,
        };
        std::process::exit(code);
    }
}

/// A single-endpoint result, named after the endpoint that produced it.
#[derive(Serialize)]
struct Scoped<T> {
    endpoint: String,
    result: T,
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::discover_or_default(&env::current_dir()?)?,
    };
    let registry = build_registry(&settings)?;

    match cli.command {
        Commands::Endpoints => {
            let endpoints: Vec<EndpointSummary> = registry
                .names()
                .iter()
                .filter_map(|name| registry.get(name))
                .map(|endpoint| endpoint.describe())
                .collect();
            output.data(&endpoints, |endpoints| {
                endpoints
                    .iter()
                    .map(|e| {
                        let tls = if e.tls { " (tls)" } else { "" };
                        format!("{}\t{}{}", e.name, e.target, tls)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        Commands::Status => {
            let status = registry.status().await;
            output.data(&status, |status| status_lines(&status.items));
            output.failures(&status.diagnostics);
        }
        Commands::Ps { all } => {
            let containers = registry.list_all_containers(all).await;
            output.data(&containers, |c| output::container_table(&c.items));
            output.failures(&containers.diagnostics);
        }
        Commands::Find { container } => {
            let endpoint = registry.resolve(None, &container).await?;
            let found = Scoped {
                endpoint: endpoint.name().to_string(),
                result: container,
            };
            output.data(&found, |found| found.endpoint.clone());
        }
        Commands::Inspect(target) => {
            let endpoint = resolve(&registry, &target).await?;
            let document = endpoint.inspect(&target.container).await?;
            output.data(&scoped(&endpoint, document), |d| {
                output::scoped_block(&d.endpoint, &pretty(&d.result))
            });
        }
        Commands::Start(target) => {
            let endpoint = resolve(&registry, &target).await?;
            endpoint.start(&target.container).await?;
            output.success(endpoint.name(), &format!("started {}", target.container));
        }
        Commands::Stop(target) => {
            let endpoint = resolve(&registry, &target).await?;
            endpoint.stop(&target.container).await?;
            output.success(endpoint.name(), &format!("stopped {}", target.container));
        }
        Commands::Restart(target) => {
            let endpoint = resolve(&registry, &target).await?;
            endpoint.restart(&target.container).await?;
            output.success(endpoint.name(), &format!("restarted {}", target.container));
        }
        Commands::Rm { target, force } => {
            let endpoint = resolve(&registry, &target).await?;
            endpoint.remove(&target.container, force).await?;
            output.success(endpoint.name(), &format!("removed {}", target.container));
        }
        Commands::Logs { target, tail } => {
            let endpoint = resolve(&registry, &target).await?;
            let logs = endpoint.logs(&target.container, tail).await?;
            output.data(&scoped(&endpoint, logs), |l| {
                output::scoped_block(&l.endpoint, &l.result)
            });
        }
        Commands::Stats(target) => {
            let endpoint = resolve(&registry, &target).await?;
            let stats = endpoint.stats(&target.container).await?;
            output.data(&scoped(&endpoint, stats), |s| stats_line(&s.endpoint, &s.result));
        }
        Commands::Images => {
            let images = registry.list_all_images().await;
            output.data(&images, |i| {
                output::grouped_table(
                    &i.items,
                    &[("IMAGE ID", "Id"), ("TAGS", "RepoTags"), ("SIZE", "Size")],
                )
            });
            output.failures(&images.diagnostics);
        }
        Commands::Pull {
            reference,
            endpoint,
        } => {
            let endpoint = registry.require(&endpoint)?;
            endpoint.pull_image(&reference).await?;
            output.success(endpoint.name(), &format!("pulled {reference}"));
        }
        Commands::Rmi {
            image,
            endpoint,
            force,
        } => {
            let endpoint = registry.require(&endpoint)?;
            endpoint.remove_image(&image, force).await?;
            output.success(endpoint.name(), &format!("removed image {image}"));
        }
        Commands::Networks => {
            let networks = registry.list_all_networks().await;
            output.data(&networks, |n| {
                output::grouped_table(
                    &n.items,
                    &[("NETWORK ID", "Id"), ("NAME", "Name"), ("DRIVER", "Driver")],
                )
            });
            output.failures(&networks.diagnostics);
        }
        Commands::Volumes => {
            let volumes = registry.list_all_volumes().await;
            output.data(&volumes, |v| {
                output::grouped_table(
                    &v.items,
                    &[("NAME", "Name"), ("DRIVER", "Driver"), ("MOUNTPOINT", "Mountpoint")],
                )
            });
            output.failures(&volumes.diagnostics);
        }
        Commands::Up {
            file,
            endpoint,
            project,
        } => {
            let yaml = tokio::fs::read_to_string(&file).await?;
            let endpoint = registry.require(&endpoint)?;
            let outcome = endpoint.deploy_compose(&yaml, project.as_deref()).await?;
            output.data(&outcome, |o| compose_message("deployed", o));
        }
        Commands::Down { project, endpoint } => {
            let endpoint = registry.require(&endpoint)?;
            let outcome = endpoint.teardown_compose(&project).await?;
            output.data(&outcome, |o| compose_message("tore down", o));
        }
    }

    Ok(())
}

fn build_registry(settings: &Settings) -> Result<EndpointRegistry> {
    let registry = EndpointRegistry::new(RegistryOptions {
        timeout: settings.timeout,
        compose: settings.compose.runner(),
    });
    for config in settings.resolve_endpoints()? {
        registry.add(config)?;
    }
    Ok(registry)
}

async fn resolve(registry: &EndpointRegistry, target: &ContainerTarget) -> Result<Arc<Endpoint>> {
    Ok(registry
        .resolve(target.endpoint.as_deref(), &target.container)
        .await?)
}

fn scoped<T>(endpoint: &Endpoint, result: T) -> Scoped<T> {
    Scoped {
        endpoint: endpoint.name().to_string(),
        result,
    }
}

fn pretty(document: &Document) -> String {
    serde_json::to_string_pretty(document).unwrap_or_default()
}

fn status_lines(status: &[EndpointStatus]) -> String {
    status
        .iter()
        .map(|s| {
            format!(
                "{}\t{}\tengine {} (api {})",
                s.name, s.target, s.version.version, s.version.api_version
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn stats_line(endpoint: &str, stats: &ContainerStats) -> String {
    format!(
        "[{}] cpu {:.2}%  mem {} / {} ({:.2}%)  net rx {} tx {}",
        endpoint,
        stats.cpu_percent,
        stats.memory_used,
        stats.memory_limit,
        stats.memory_percent,
        stats.network_rx,
        stats.network_tx
    )
}

fn compose_message(action: &str, outcome: &ComposeOutcome) -> String {
    let mut message = match &outcome.project {
        Some(project) => format!("[{}] {} {}", outcome.endpoint, action, project),
        None => format!("[{}] {}", outcome.endpoint, action),
    };
    let stdout = outcome.output.stdout.trim();
    if !stdout.is_empty() {
        message.push('\n');
        message.push_str(stdout);
    }
    message
}
