// ABOUTME: Engine client layer: capability traits and the bollard implementation.
// ABOUTME: Everything above this module talks to engines through EngineApi.

mod bollard;
mod error;
mod stats;
pub mod traits;
mod types;

pub use self::bollard::BollardEngine;
pub use error::EngineError;
pub use stats::ContainerStats;
pub use traits::{ContainerOps, EngineApi, ImageOps, NetworkOps, RuntimeInfo, VolumeOps};
pub use types::{ContainerDescriptor, Document, EngineVersion, PortMapping, into_document};
