// ABOUTME: Library root for dockfleet - one control point for many container engines.
// ABOUTME: The main binary is in main.rs.

pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod output;
pub mod registry;

pub use endpoint::{Endpoint, EndpointError, ErrorKind};
pub use registry::{EndpointRegistry, RegistryOptions};
