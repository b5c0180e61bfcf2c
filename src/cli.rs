// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockfleet")]
#[command(about = "One control point for containers across many Docker engines")]
#[command(version)]
pub struct Cli {
    /// Settings file (default: dockfleet.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// A container plus the endpoint it lives on.
#[derive(Args, Debug, Clone)]
pub struct ContainerTarget {
    /// Container ID or name
    pub container: String,

    /// Endpoint to use (searched across all endpoints when omitted)
    #[arg(short, long)]
    pub endpoint: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured endpoints
    Endpoints,

    /// Ping every endpoint and show its engine version
    Status,

    /// List containers on every endpoint
    Ps {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
    },

    /// Show which endpoint a container is on
    Find {
        /// Container ID or name
        container: String,
    },

    /// Show a container's full engine document
    Inspect(ContainerTarget),

    /// Start a container
    Start(ContainerTarget),

    /// Stop a container
    Stop(ContainerTarget),

    /// Restart a container
    Restart(ContainerTarget),

    /// Remove a container
    Rm {
        #[command(flatten)]
        target: ContainerTarget,

        /// Stop the container first if it is running
        #[arg(short, long)]
        force: bool,
    },

    /// Show a container's recent log output
    Logs {
        #[command(flatten)]
        target: ContainerTarget,

        /// Number of lines from the end
        #[arg(short = 'n', long)]
        tail: Option<u64>,
    },

    /// Show a container's resource usage
    Stats(ContainerTarget),

    /// List images on every endpoint
    Images,

    /// Pull an image onto an endpoint
    Pull {
        /// Image reference, e.g. nginx:1.27
        reference: String,

        #[arg(short, long)]
        endpoint: String,
    },

    /// Remove an image from an endpoint
    Rmi {
        /// Image ID or reference
        image: String,

        #[arg(short, long)]
        endpoint: String,

        #[arg(short, long)]
        force: bool,
    },

    /// List networks on every endpoint
    Networks,

    /// List volumes on every endpoint
    Volumes,

    /// Deploy a Compose file to an endpoint
    Up {
        /// Compose file to deploy
        file: PathBuf,

        #[arg(short, long)]
        endpoint: String,

        /// Compose project name
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Tear down a Compose project (and its volumes) on an endpoint
    Down {
        /// Compose project name
        project: String,

        #[arg(short, long)]
        endpoint: String,
    },
}
