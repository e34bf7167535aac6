//! Visualization layer: Bevy client mirroring the traffic simulation.

pub mod agents;
pub mod camera;
pub mod debug;
pub mod plugin;
pub mod transport;
pub mod visuals;

pub use plugin::MirrorVizPlugin;
