// ABOUTME: Composable capability traits for engine clients.
// ABOUTME: Defines ContainerOps, ImageOps, NetworkOps, VolumeOps, RuntimeInfo, and EngineApi.

mod container;
mod image;
mod network;
mod runtime_info;

pub use container::ContainerOps;
pub use image::ImageOps;
pub use network::{NetworkOps, VolumeOps};
pub use runtime_info::RuntimeInfo;

/// Every capability an endpoint needs from its client.
///
/// Implemented automatically for any type providing all the capability
/// traits, so test doubles only implement the pieces.
pub trait EngineApi: ContainerOps + ImageOps + NetworkOps + VolumeOps + RuntimeInfo {}

impl<T> EngineApi for T where T: ContainerOps + ImageOps + NetworkOps + VolumeOps + RuntimeInfo {}
