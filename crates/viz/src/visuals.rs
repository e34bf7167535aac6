//! Agent visuals: prefab library, spawning, and appearance materials.

use bevy::prelude::*;
use std::collections::HashMap;

use sync_core::{
    LampState, ParkingState, SpawnRequest, SyncEngine, Treatment, VisualBackend,
};
use sync_events::{AgentId, AgentKind};

use crate::agents::{MirrorSet, SnapshotApplied};

/// Plugin for the visual side of mirrored agents.
pub struct VisualsPlugin;

impl Plugin for VisualsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (build_prefab_library, spawn_ground))
            .add_systems(
                Update,
                (apply_vehicle_treatments, apply_lamps, apply_parking)
                    .in_set(MirrorSet::Appearance)
                    .run_if(on_event::<SnapshotApplied>()),
            );
    }
}

/// Mesh and material used to instantiate one agent kind.
#[derive(Clone, Debug)]
pub struct Prefab {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

/// Type to representation mapping, plus the lamp and parking materials.
#[derive(Resource, Default)]
pub struct PrefabLibrary {
    pub prefabs: HashMap<AgentKind, Prefab>,
    pub lamp_mesh: Handle<Mesh>,
    pub lamp_materials: HashMap<LampState, Handle<StandardMaterial>>,
    pub parking_materials: HashMap<ParkingState, Handle<StandardMaterial>>,
}

impl PrefabLibrary {
    pub fn get(&self, kind: AgentKind) -> Option<&Prefab> {
        self.prefabs.get(&kind)
    }
}

/// Root component of a spawned agent visual.
#[derive(Component, Debug)]
pub struct AgentVisual {
    pub agent_id: AgentId,
    pub kind: AgentKind,
}

/// Body of a vehicle, tinted by its treatment.
#[derive(Component)]
pub struct VehicleBody;

/// One lamp of a traffic light.
#[derive(Component, Debug, Clone, Copy)]
pub struct Lamp(pub LampState);

/// Surface of a parking slot.
#[derive(Component)]
pub struct ParkingSurface;

/// Converts a treatment into a body color.
pub fn treatment_color(treatment: Treatment) -> Color {
    let [r, g, b] = treatment.rgb();
    Color::srgb(r, g, b)
}

/// Height of each lamp above the traffic light's origin.
pub fn lamp_offset(lamp: LampState) -> Vec3 {
    match lamp {
        LampState::Red => Vec3::new(0.0, 3.2, 0.0),
        LampState::Yellow => Vec3::new(0.0, 2.7, 0.0),
        LampState::Green => Vec3::new(0.0, 2.2, 0.0),
    }
}

/// Spawns and releases visuals through deferred [`Commands`].
pub struct CommandsBackend<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub prefabs: &'a PrefabLibrary,
    pub materials: &'a mut Assets<StandardMaterial>,
}

impl VisualBackend for CommandsBackend<'_, '_, '_> {
    fn spawn(&mut self, request: &SpawnRequest) -> Option<Entity> {
        let prefab = self.prefabs.get(request.kind)?;

        // Vehicles are tinted individually, so each one gets its own material
        let material = if request.kind.is_vehicle() {
            let base = self.materials.get(&prefab.material).cloned().unwrap_or_default();
            self.materials.add(base)
        } else {
            prefab.material.clone()
        };

        let mut entity = self.commands.spawn((
            PbrBundle {
                mesh: prefab.mesh.clone(),
                material,
                transform: Transform::from_translation(request.position)
                    .with_rotation(request.rotation),
                ..default()
            },
            AgentVisual {
                agent_id: request.id,
                kind: request.kind,
            },
            Name::new(request.name()),
        ));

        match request.kind {
            AgentKind::Vehicle | AgentKind::PoliceVehicle | AgentKind::ChaoticVehicle => {
                entity.insert(VehicleBody);
            }
            AgentKind::Destination => {
                entity.insert(ParkingSurface);
            }
            AgentKind::TrafficLight => {
                let lamp_mesh = self.prefabs.lamp_mesh.clone();
                let lamp_materials = &self.prefabs.lamp_materials;
                entity.with_children(|parent| {
                    for &lamp in LampState::all() {
                        let Some(material) = lamp_materials.get(&lamp) else {
                            continue;
                        };
                        parent.spawn((
                            PbrBundle {
                                mesh: lamp_mesh.clone(),
                                material: material.clone(),
                                transform: Transform::from_translation(lamp_offset(lamp)),
                                visibility: Visibility::Hidden,
                                ..default()
                            },
                            Lamp(lamp),
                        ));
                    }
                });
            }
            AgentKind::Obstacle => {}
        }

        Some(entity.id())
    }

    fn release(&mut self, visual: Entity) {
        if let Some(entity) = self.commands.get_entity(visual) {
            entity.despawn_recursive();
        }
    }
}

fn build_prefab_library(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mut library = PrefabLibrary::default();

    let vehicle_mesh = meshes.add(Cuboid::new(1.8, 1.2, 4.0));
    for kind in [
        AgentKind::Vehicle,
        AgentKind::PoliceVehicle,
        AgentKind::ChaoticVehicle,
    ] {
        library.prefabs.insert(
            kind,
            Prefab {
                mesh: vehicle_mesh.clone(),
                material: materials.add(Color::WHITE),
            },
        );
    }

    library.prefabs.insert(
        AgentKind::TrafficLight,
        Prefab {
            mesh: meshes.add(Cylinder::new(0.15, 4.0)),
            material: materials.add(Color::srgb(0.2, 0.2, 0.2)),
        },
    );
    library.prefabs.insert(
        AgentKind::Obstacle,
        Prefab {
            mesh: meshes.add(Cuboid::new(2.0, 2.0, 2.0)),
            material: materials.add(Color::srgb(0.45, 0.3, 0.2)),
        },
    );
    library.prefabs.insert(
        AgentKind::Destination,
        Prefab {
            mesh: meshes.add(Cuboid::new(2.5, 0.05, 5.0)),
            material: materials.add(Color::srgb(0.6, 0.6, 0.6)),
        },
    );

    library.lamp_mesh = meshes.add(Sphere::new(0.25));
    for (lamp, color) in [
        (LampState::Green, Color::srgb(0.1, 1.0, 0.2)),
        (LampState::Yellow, Color::srgb(1.0, 0.85, 0.1)),
        (LampState::Red, Color::srgb(1.0, 0.1, 0.1)),
    ] {
        let material = materials.add(StandardMaterial {
            base_color: color,
            emissive: color.to_linear() * 4.0,
            ..default()
        });
        library.lamp_materials.insert(lamp, material);
    }

    for (slot, color) in [
        (ParkingState::Free, Color::srgb(0.2, 0.8, 0.3)),
        (ParkingState::Reserved, Color::srgb(0.95, 0.75, 0.1)),
        (ParkingState::Occupied, Color::srgb(0.85, 0.2, 0.2)),
    ] {
        library
            .parking_materials
            .insert(slot, materials.add(color));
    }

    commands.insert_resource(library);
}

fn spawn_ground(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Plane3d::default().mesh().size(200.0, 200.0)),
            material: materials.add(Color::srgb(0.25, 0.27, 0.25)),
            transform: Transform::from_xyz(0.0, -0.01, 0.0),
            ..default()
        },
        Name::new("Ground"),
    ));
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(30.0, 60.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}

/// Tints each vehicle body with its current treatment.
fn apply_vehicle_treatments(
    engine: Res<SyncEngine>,
    bodies: Query<&Handle<StandardMaterial>, With<VehicleBody>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for tracked in engine.registry().iter() {
        let Some(treatment) = tracked.appearance.treatment() else {
            continue;
        };
        let Ok(handle) = bodies.get(tracked.visual()) else {
            continue;
        };
        if let Some(material) = materials.get_mut(handle) {
            material.base_color = treatment_color(treatment);
        }
    }
}

/// Shows the active lamp of every traffic light and hides the others.
fn apply_lamps(
    engine: Res<SyncEngine>,
    mut lamps: Query<(&Lamp, &Parent, &mut Visibility)>,
) {
    let active: HashMap<Entity, LampState> = engine
        .registry()
        .iter()
        .filter_map(|tracked| {
            tracked
                .appearance
                .lamps()
                .map(|lamps| (tracked.visual(), lamps.active()))
        })
        .collect();

    for (lamp, parent, mut visibility) in lamps.iter_mut() {
        let Some(&lit) = active.get(&parent.get()) else {
            continue;
        };
        let wanted = if lit == lamp.0 {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}

/// Swaps parking slot materials to match their occupancy.
fn apply_parking(
    engine: Res<SyncEngine>,
    prefabs: Res<PrefabLibrary>,
    mut surfaces: Query<&mut Handle<StandardMaterial>, With<ParkingSurface>>,
) {
    for tracked in engine.registry().iter() {
        let Some(slot) = tracked.appearance.parking() else {
            continue;
        };
        let Some(material) = prefabs.parking_materials.get(&slot) else {
            continue;
        };
        if let Ok(mut handle) = surfaces.get_mut(tracked.visual()) {
            if *handle != *material {
                *handle = material.clone();
            }
        }
    }
}
