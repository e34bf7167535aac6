//! Debug overlay for development information display.
//!
//! Shows FPS, link state, live agent count, and step counters.
//! Toggle with F3 key.

use bevy::prelude::*;
use std::collections::VecDeque;

use sync_core::{CommandEmitter, LinkState, LinkStatus, SyncEngine};

use crate::camera::CameraRig;

/// Plugin for the debug overlay.
pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugOverlay>()
            .add_systems(Startup, setup_debug_overlay)
            .add_systems(Update, (toggle_debug_overlay, update_debug_display));
    }
}

/// Resource controlling debug overlay settings.
#[derive(Resource)]
pub struct DebugOverlay {
    /// Whether the debug overlay is visible.
    pub enabled: bool,
    /// Show FPS counter.
    pub show_fps: bool,
    /// Show the active camera viewpoint.
    pub show_camera_info: bool,
}

impl Default for DebugOverlay {
    fn default() -> Self {
        Self {
            enabled: false,
            show_fps: true,
            show_camera_info: true,
        }
    }
}

/// Component marking the debug overlay container.
#[derive(Component)]
pub struct DebugOverlayContainer;

/// Component for the debug text.
#[derive(Component)]
pub struct DebugText;

/// Local resource for FPS history.
#[derive(Default)]
struct FpsHistory {
    history: VecDeque<f32>,
}

impl FpsHistory {
    fn push(&mut self, fps: f32) {
        self.history.push_back(fps);
        if self.history.len() > 60 {
            self.history.pop_front();
        }
    }

    fn average(&self) -> f32 {
        if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f32>() / self.history.len() as f32
        }
    }
}

/// Snapshot of the numbers shown in the overlay.
#[derive(Debug, Clone, Default)]
pub struct DebugReadout {
    pub fps: f32,
    pub link: LinkState,
    pub connections: u32,
    pub agents: usize,
    pub snapshots: u64,
    pub steps_sent: u64,
    pub steps_dropped: u64,
    pub viewpoint: Option<String>,
    pub last_error: Option<String>,
    pub last_decode_error: Option<String>,
}

impl DebugReadout {
    /// Formats the overlay lines.
    pub fn lines(&self, overlay: &DebugOverlay) -> Vec<String> {
        let mut lines = Vec::new();

        if overlay.show_fps {
            let fps_flag = if self.fps < 30.0 { "LOW!" } else { "" };
            lines.push(format!("FPS: {:.0} {}", self.fps, fps_flag));
        }

        let link = match self.link {
            LinkState::Connecting => "connecting",
            LinkState::Open => "open",
            LinkState::Closed => "closed",
        };
        lines.push(format!("Link: {} ({} connections)", link, self.connections));
        lines.push(format!("Agents: {}", self.agents));
        lines.push(format!("Snapshots: {}", self.snapshots));
        lines.push(format!(
            "Steps: {} sent, {} dropped",
            self.steps_sent, self.steps_dropped
        ));

        if overlay.show_camera_info {
            if let Some(ref viewpoint) = self.viewpoint {
                lines.push(format!("Camera: {}", viewpoint));
            }
        }

        if let Some(ref error) = self.last_error {
            lines.push(format!("ERROR: {}", error));
        }
        if let Some(ref error) = self.last_decode_error {
            lines.push(format!("DECODE: {}", error));
        }

        lines
    }
}

/// System to set up the debug overlay UI.
fn setup_debug_overlay(mut commands: Commands) {
    // Debug overlay container (top-left)
    commands
        .spawn((
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    left: Val::Px(10.0),
                    padding: UiRect::all(Val::Px(10.0)),
                    flex_direction: FlexDirection::Column,
                    ..default()
                },
                background_color: Color::srgba(0.0, 0.0, 0.0, 0.8).into(),
                visibility: Visibility::Hidden,
                ..default()
            },
            DebugOverlayContainer,
        ))
        .with_children(|parent| {
            parent.spawn(TextBundle::from_section(
                "DEBUG (F3 to toggle, C to switch camera)",
                TextStyle {
                    font_size: 14.0,
                    color: Color::srgb(0.9, 0.9, 0.3),
                    ..default()
                },
            ));

            parent.spawn((
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: 12.0,
                        color: Color::srgb(0.8, 0.8, 0.8),
                        ..default()
                    },
                ),
                DebugText,
            ));
        });
}

/// System to toggle debug overlay with F3.
fn toggle_debug_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut debug_overlay: ResMut<DebugOverlay>,
    mut container: Query<&mut Visibility, With<DebugOverlayContainer>>,
) {
    if keyboard.just_pressed(KeyCode::F3) {
        debug_overlay.enabled = !debug_overlay.enabled;

        for mut visibility in container.iter_mut() {
            *visibility = if debug_overlay.enabled {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }

        let status = if debug_overlay.enabled { "ON" } else { "OFF" };
        tracing::info!("Debug overlay: {}", status);
    }
}

/// System to update debug display data.
#[allow(clippy::too_many_arguments)]
fn update_debug_display(
    debug_overlay: Res<DebugOverlay>,
    engine: Res<SyncEngine>,
    link: Res<LinkStatus>,
    emitter: Res<CommandEmitter>,
    rig: Res<CameraRig>,
    time: Res<Time>,
    mut fps_history: Local<FpsHistory>,
    mut debug_text: Query<&mut Text, With<DebugText>>,
) {
    if !debug_overlay.enabled {
        return;
    }

    let dt = time.delta_seconds();
    if dt > 0.0 {
        fps_history.push(1.0 / dt);
    }

    let readout = DebugReadout {
        fps: fps_history.average(),
        link: link.state,
        connections: link.connections,
        agents: engine.registry().len(),
        snapshots: engine.snapshots_applied(),
        steps_sent: emitter.sent,
        steps_dropped: emitter.dropped,
        viewpoint: rig.active_viewpoint().map(|v| v.name.clone()),
        last_error: link.last_error.clone(),
        last_decode_error: link.last_decode_error.clone(),
    };
    let body = readout.lines(&debug_overlay).join("\n");

    for mut text in debug_text.iter_mut() {
        if let Some(section) = text.sections.first_mut() {
            section.value.clone_from(&body);
            // Color by performance
            section.style.color = if readout.fps < 30.0 {
                Color::srgb(1.0, 0.3, 0.3)
            } else if readout.fps < 55.0 {
                Color::srgb(1.0, 0.8, 0.3)
            } else {
                Color::srgb(0.8, 0.8, 0.8)
            };
        }
    }
}
