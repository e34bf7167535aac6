//! Main visualization plugin that ties all systems together.

use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;

use crate::agents::AgentPlugin;
use crate::camera::CameraPlugin;
use crate::debug::DebugPlugin;
use crate::visuals::VisualsPlugin;

/// Default tracing filter for the client.
pub const DEFAULT_LOG_FILTER: &str = "info,wgpu=error,naga=warn";

/// Main plugin for the traffic mirror.
///
/// This plugin sets up the window and logging, then adds the sub-plugins
/// that connect to the simulation and render its agents.
pub struct MirrorVizPlugin {
    /// `tracing` filter directives passed to the log plugin.
    pub log_filter: String,
}

impl Default for MirrorVizPlugin {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl Plugin for MirrorVizPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Traffic Mirror".into(),
                        resolution: (1280., 720.).into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    filter: self.log_filter.clone(),
                    level: Level::INFO,
                    ..default()
                }),
        )
        .insert_resource(ClearColor(Color::srgb(0.55, 0.7, 0.85)))
        .add_plugins((VisualsPlugin, AgentPlugin, CameraPlugin, DebugPlugin));
    }
}
