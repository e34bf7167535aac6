//! Camera system: fixed viewpoints, cycling, and transitions.

use bevy::prelude::*;

/// Plugin for camera viewpoints.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraRig>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    handle_keyboard_input,
                    update_camera_transition,
                    apply_camera_to_transform,
                )
                    .chain(),
            );
    }
}

/// A named place to look at the scene from.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewpoint {
    pub name: String,
    /// Camera position in world coordinates.
    pub eye: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
}

impl Viewpoint {
    pub fn new(name: impl Into<String>, eye: Vec3, target: Vec3) -> Self {
        Self {
            name: name.into(),
            eye,
            target,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye).looking_at(self.target, Vec3::Y)
    }
}

/// Camera rig resource: the viewpoint list and the current framing.
#[derive(Resource)]
pub struct CameraRig {
    pub viewpoints: Vec<Viewpoint>,
    /// Index of the active viewpoint.
    pub active: usize,
    /// Current eye position.
    pub eye: Vec3,
    /// Current look-at point.
    pub target: Vec3,
    /// Seconds spent moving between viewpoints (0 cuts instantly).
    pub transition_secs: f32,
    /// Active camera transition, if any.
    pub transition: Option<CameraTransition>,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(vec![
            Viewpoint::new("Overview", Vec3::new(10.0, 70.0, 55.0), Vec3::new(10.0, 0.0, 10.0)),
            Viewpoint::new("Intersection", Vec3::new(30.0, 18.0, 28.0), Vec3::new(11.0, 0.0, 10.0)),
            Viewpoint::new("Parking", Vec3::new(21.0, 12.0, -12.0), Vec3::new(21.0, 0.0, 3.0)),
            Viewpoint::new("Street", Vec3::new(-8.0, 3.0, 0.0), Vec3::new(10.0, 0.0, 8.0)),
        ])
    }
}

impl CameraRig {
    pub fn new(viewpoints: Vec<Viewpoint>) -> Self {
        let (eye, target) = viewpoints
            .first()
            .map(|v| (v.eye, v.target))
            .unwrap_or((Vec3::new(0.0, 50.0, 50.0), Vec3::ZERO));
        Self {
            viewpoints,
            active: 0,
            eye,
            target,
            transition_secs: 0.6,
            transition: None,
        }
    }

    /// The active viewpoint, if any are configured.
    pub fn active_viewpoint(&self) -> Option<&Viewpoint> {
        self.viewpoints.get(self.active)
    }

    /// Advances to the next viewpoint, wrapping at the end of the list.
    pub fn cycle(&mut self) -> Option<&Viewpoint> {
        if self.viewpoints.is_empty() {
            return None;
        }
        self.active = (self.active + 1) % self.viewpoints.len();
        self.begin_transition_to_active();
        self.viewpoints.get(self.active)
    }

    /// Returns to the first viewpoint.
    pub fn reset(&mut self) -> Option<&Viewpoint> {
        if self.viewpoints.is_empty() {
            return None;
        }
        self.active = 0;
        self.begin_transition_to_active();
        self.viewpoints.first()
    }

    fn begin_transition_to_active(&mut self) {
        let Some(viewpoint) = self.viewpoints.get(self.active) else {
            return;
        };
        self.transition = Some(CameraTransition {
            from_eye: self.eye,
            to_eye: viewpoint.eye,
            from_target: self.target,
            to_target: viewpoint.target,
            duration: self.transition_secs,
            elapsed: 0.0,
        });
    }

    /// Steps the active transition by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        transition.elapsed += dt;
        self.eye = transition.current_eye();
        self.target = transition.current_target();
        if transition.is_complete() {
            self.transition = None;
        }
    }
}

/// Active camera transition state.
#[derive(Clone, Debug)]
pub struct CameraTransition {
    pub from_eye: Vec3,
    pub to_eye: Vec3,
    pub from_target: Vec3,
    pub to_target: Vec3,
    /// Total duration in seconds.
    pub duration: f32,
    /// Time elapsed so far.
    pub elapsed: f32,
}

impl CameraTransition {
    /// Get the progress of this transition (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn current_eye(&self) -> Vec3 {
        self.from_eye.lerp(self.to_eye, ease_in_out(self.progress()))
    }

    pub fn current_target(&self) -> Vec3 {
        self.from_target
            .lerp(self.to_target, ease_in_out(self.progress()))
    }
}

/// Smooth ease-in-out function for transitions.
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Marker component for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// System to set up the camera on startup.
fn setup_camera(mut commands: Commands, rig: Res<CameraRig>) {
    match rig.active_viewpoint() {
        Some(viewpoint) => tracing::info!("Camera at: {}", viewpoint.name),
        None => tracing::error!("No camera viewpoints configured"),
    }

    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_translation(rig.eye).looking_at(rig.target, Vec3::Y),
            ..default()
        },
        MainCamera,
    ));
}

/// System to handle keyboard input for camera controls.
fn handle_keyboard_input(keyboard: Res<ButtonInput<KeyCode>>, mut rig: ResMut<CameraRig>) {
    // C cycles through the viewpoints
    if keyboard.just_pressed(KeyCode::KeyC) {
        match rig.cycle() {
            Some(viewpoint) => tracing::info!("Switching to: {}", viewpoint.name),
            None => tracing::error!("No camera viewpoints configured"),
        }
    }

    // Home key - back to the first viewpoint
    if keyboard.just_pressed(KeyCode::Home) {
        if let Some(viewpoint) = rig.reset() {
            tracing::info!("Switching to: {}", viewpoint.name);
        }
    }
}

/// System to update camera transitions.
fn update_camera_transition(mut rig: ResMut<CameraRig>, time: Res<Time>) {
    rig.advance(time.delta_seconds());
}

/// System to apply the rig to the actual camera transform.
fn apply_camera_to_transform(
    rig: Res<CameraRig>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    if !rig.is_changed() {
        return;
    }
    for mut transform in camera_query.iter_mut() {
        *transform = Transform::from_translation(rig.eye).looking_at(rig.target, Vec3::Y);
    }
}
