//! Snapshot reconciliation.
//!
//! Derives create/update/destroy operations from one snapshot and applies
//! them to the [`Registry`]. After a call the registry holds exactly the
//! agents of the snapshot that could be given a visual.

use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use std::collections::HashSet;
use thiserror::Error;

use sync_events::{AgentId, AgentKind, AgentRecord, Direction};

use crate::config::PresentationConfig;
use crate::registry::{OrientationSource, Registry, TrackedEntity};

/// Everything the visual layer needs to build a representation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub id: AgentId,
    pub kind: AgentKind,
    pub position: Vec3,
    pub rotation: Quat,
}

impl SpawnRequest {
    /// Display name of the visual, e.g. `PoliceCar_201`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.kind.wire_name(), self.id)
    }
}

/// The visual layer: instantiates and releases agent representations.
pub trait VisualBackend {
    /// Spawns the visual for a new agent, or `None` if the kind has no
    /// representation configured.
    fn spawn(&mut self, request: &SpawnRequest) -> Option<Entity>;

    /// Releases a visual previously returned by [`VisualBackend::spawn`].
    fn release(&mut self, visual: Entity);
}

/// A non-fatal problem found while reconciling a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileIssue {
    #[error("agent {id}: unknown agent type '{agent_type}', not created")]
    UnknownKind { id: AgentId, agent_type: String },
    #[error("agent {id}: no visual configured for {kind}, not created")]
    MissingVisual { id: AgentId, kind: AgentKind },
    #[error("agent {id}: registered as {registered} but reported as '{reported}', record ignored")]
    KindMismatch {
        id: AgentId,
        registered: AgentKind,
        reported: String,
    },
    #[error("agent {id}: listed more than once in one snapshot, extra record ignored")]
    DuplicateId { id: AgentId },
    #[error("agent {id}: unknown direction '{direction}'")]
    UnknownDirection { id: AgentId, direction: String },
    #[error("agent {id}: unrecognized {kind} state '{state}', appearance unchanged")]
    UnrecognizedState {
        id: AgentId,
        kind: AgentKind,
        state: String,
    },
}

/// Outcome of reconciling one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<AgentId>,
    pub updated: Vec<AgentId>,
    pub removed: Vec<AgentId>,
    pub issues: Vec<ReconcileIssue>,
}

impl ReconcileReport {
    /// Whether any entity was created or destroyed.
    pub fn changed_membership(&self) -> bool {
        !self.created.is_empty() || !self.removed.is_empty()
    }
}

/// Maps a planar simulation coordinate onto the render plane.
pub fn plane_position(x: f32, y: f32, ground_height: f32) -> Vec3 {
    Vec3::new(x, ground_height, y)
}

/// Rotation about the vertical axis for a yaw in degrees.
pub fn yaw_rotation(degrees: f32) -> Quat {
    Quat::from_rotation_y(degrees.to_radians())
}

fn direction_yaw(direction: Direction) -> f32 {
    match direction {
        Direction::Heading(heading) => heading.yaw_degrees(),
        Direction::Axis(axis) => axis.yaw_degrees(),
    }
}

/// Reconciles the registry against one snapshot.
pub fn reconcile<V: VisualBackend + ?Sized>(
    registry: &mut Registry,
    config: &PresentationConfig,
    records: &[AgentRecord],
    visuals: &mut V,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen: HashSet<AgentId> = HashSet::with_capacity(records.len());

    for record in records {
        let id = record.id;
        if !seen.insert(id) {
            report.issues.push(ReconcileIssue::DuplicateId { id });
            continue;
        }

        let direction = match record.direction() {
            Ok(direction) => direction,
            Err(err) => {
                report.issues.push(ReconcileIssue::UnknownDirection {
                    id,
                    direction: err.0,
                });
                None
            }
        };

        let target = plane_position(record.x, record.y, config.ground_height);

        if let Some(entity) = registry.get_mut(id) {
            if record.kind() != Ok(entity.kind()) {
                report.issues.push(ReconcileIssue::KindMismatch {
                    id,
                    registered: entity.kind(),
                    reported: record.agent_type.clone(),
                });
                continue;
            }
            entity.target_position = target;
            report.updated.push(id);
        } else {
            let kind = match record.kind() {
                Ok(kind) => kind,
                Err(err) => {
                    report.issues.push(ReconcileIssue::UnknownKind {
                        id,
                        agent_type: err.0,
                    });
                    continue;
                }
            };

            let request = SpawnRequest {
                id,
                kind,
                position: target,
                rotation: direction
                    .map(|d| yaw_rotation(direction_yaw(d)))
                    .unwrap_or(Quat::IDENTITY),
            };
            let Some(visual) = visuals.spawn(&request) else {
                report.issues.push(ReconcileIssue::MissingVisual { id, kind });
                continue;
            };

            let entity = TrackedEntity::new(
                id,
                kind,
                visual,
                request.position,
                request.rotation,
                config.heading_offset_degrees.to_radians(),
            );
            if let Err(rejected) = registry.insert(entity) {
                // The id was checked above; give the visual back rather than leak it.
                visuals.release(rejected.visual());
                continue;
            }
            report.created.push(id);
        }

        let Some(entity) = registry.get_mut(id) else {
            continue;
        };
        apply_record_state(entity, record, direction, &mut report);
    }

    let stale: Vec<AgentId> = registry.ids().filter(|id| !seen.contains(id)).collect();
    for id in stale {
        if let Some(entity) = registry.remove(id) {
            visuals.release(entity.visual());
            report.removed.push(id);
        }
    }

    for issue in &report.issues {
        tracing::warn!("{}", issue);
    }

    report
}

/// Stores the record's state on the entity and drives its state machine.
fn apply_record_state(
    entity: &mut TrackedEntity,
    record: &AgentRecord,
    direction: Option<Direction>,
    report: &mut ReconcileReport,
) {
    let state = record.state();
    entity.last_state = state.map(str::to_string);

    if let Err(err) = entity.appearance.apply(state) {
        report.issues.push(ReconcileIssue::UnrecognizedState {
            id: entity.id(),
            kind: entity.kind(),
            state: err.0,
        });
    }

    if entity.orientation == OrientationSource::Snapshot {
        if let Some(Direction::Axis(axis)) = direction {
            entity.target_rotation = yaw_rotation(axis.yaw_degrees());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appearance::{LampState, ParkingState, Treatment};

    /// Records every spawn and release.
    #[derive(Default)]
    struct RecordingBackend {
        next: u32,
        spawned: Vec<SpawnRequest>,
        released: Vec<Entity>,
        refuse: Vec<AgentKind>,
    }

    impl VisualBackend for RecordingBackend {
        fn spawn(&mut self, request: &SpawnRequest) -> Option<Entity> {
            if self.refuse.contains(&request.kind) {
                return None;
            }
            self.next += 1;
            self.spawned.push(request.clone());
            Some(Entity::from_raw(self.next))
        }

        fn release(&mut self, visual: Entity) {
            self.released.push(visual);
        }
    }

    fn run(
        registry: &mut Registry,
        backend: &mut RecordingBackend,
        records: &[AgentRecord],
    ) -> ReconcileReport {
        reconcile(registry, &PresentationConfig::default(), records, backend)
    }

    fn ids(registry: &Registry) -> Vec<AgentId> {
        let mut ids: Vec<_> = registry.ids().collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_create_update_destroy_scenario() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        let report = run(&mut registry, &mut backend, &[AgentRecord::new(1, "Car", 0.0, 0.0)]);
        assert_eq!(report.created, vec![1]);
        assert_eq!(
            registry.get(1).unwrap().target_position,
            Vec3::new(0.0, 0.0, 0.0)
        );

        let report = run(&mut registry, &mut backend, &[AgentRecord::new(1, "Car", 5.0, 0.0)]);
        assert_eq!(report.updated, vec![1]);
        assert!(report.created.is_empty());
        let entity = registry.get(1).unwrap();
        assert_eq!(entity.target_position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(entity.rendered_position, Vec3::ZERO);

        let report = run(&mut registry, &mut backend, &[]);
        assert_eq!(report.removed, vec![1]);
        assert!(registry.is_empty());
        assert_eq!(backend.spawned.len(), 1);
        assert_eq!(backend.released, vec![Entity::from_raw(1)]);
    }

    #[test]
    fn test_update_keeps_visual() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        run(&mut registry, &mut backend, &[AgentRecord::new(7, "PoliceCar", 1.0, 1.0)]);
        let visual = registry.get(7).unwrap().visual();
        run(&mut registry, &mut backend, &[AgentRecord::new(7, "PoliceCar", 2.0, 1.0)]);

        assert_eq!(registry.get(7).unwrap().visual(), visual);
        assert_eq!(backend.spawned.len(), 1);
        assert!(backend.released.is_empty());
    }

    #[test]
    fn test_registry_matches_snapshot_ids() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        let first = sync_events::fixtures::intersection_update();
        run(&mut registry, &mut backend, &first);
        assert_eq!(ids(&registry), vec![1, 2, 3, 201, 250, 300, 400, 401]);

        let second = sync_events::fixtures::intersection_next();
        let report = run(&mut registry, &mut backend, &second);
        assert_eq!(ids(&registry), vec![1, 2, 3, 201, 250, 400, 401]);
        assert_eq!(report.removed, vec![300]);
    }

    #[test]
    fn test_removal_is_idempotent() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();
        let both = [
            AgentRecord::new(1, "Car", 0.0, 0.0),
            AgentRecord::new(2, "Obstacle", 3.0, 3.0),
        ];
        let only_one = [AgentRecord::new(1, "Car", 0.0, 0.0)];

        run(&mut registry, &mut backend, &both);
        let report = run(&mut registry, &mut backend, &only_one);
        assert_eq!(report.removed, vec![2]);

        let report = run(&mut registry, &mut backend, &only_one);
        assert!(report.removed.is_empty());
        assert_eq!(backend.released.len(), 1);
    }

    #[test]
    fn test_unknown_kind_is_skipped_but_not_blacklisted() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        let report = run(&mut registry, &mut backend, &[AgentRecord::new(9, "Blimp", 0.0, 0.0)]);
        assert!(registry.is_empty());
        assert_eq!(
            report.issues,
            vec![ReconcileIssue::UnknownKind {
                id: 9,
                agent_type: "Blimp".into()
            }]
        );

        let report = run(&mut registry, &mut backend, &[AgentRecord::new(9, "Blimp", 1.0, 0.0)]);
        assert_eq!(report.issues.len(), 1);

        run(&mut registry, &mut backend, &[AgentRecord::new(9, "Car", 1.0, 0.0)]);
        assert!(registry.contains(9));
    }

    #[test]
    fn test_missing_visual_skips_creation() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend {
            refuse: vec![AgentKind::Obstacle],
            ..Default::default()
        };

        let report = run(&mut registry, &mut backend, &[AgentRecord::new(3, "Obstacle", 0.0, 0.0)]);
        assert!(registry.is_empty());
        assert_eq!(
            report.issues,
            vec![ReconcileIssue::MissingVisual {
                id: 3,
                kind: AgentKind::Obstacle
            }]
        );
    }

    #[test]
    fn test_kind_mismatch_is_reported_and_entity_kept() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        run(&mut registry, &mut backend, &[AgentRecord::new(5, "Car", 0.0, 0.0)]);
        let report = run(
            &mut registry,
            &mut backend,
            &[AgentRecord::new(5, "TrafficLight", 9.0, 9.0).with_state("red")],
        );

        assert!(matches!(
            report.issues.as_slice(),
            [ReconcileIssue::KindMismatch { id: 5, registered: AgentKind::Vehicle, .. }]
        ));
        let entity = registry.get(5).unwrap();
        assert_eq!(entity.kind(), AgentKind::Vehicle);
        assert_eq!(entity.target_position, Vec3::ZERO);
        assert!(backend.released.is_empty());
        assert_eq!(backend.spawned.len(), 1);
    }

    #[test]
    fn test_duplicate_id_first_record_wins() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        let report = run(
            &mut registry,
            &mut backend,
            &[
                AgentRecord::new(1, "Car", 1.0, 1.0),
                AgentRecord::new(1, "Car", 8.0, 8.0),
            ],
        );
        assert_eq!(report.created, vec![1]);
        assert_eq!(report.issues, vec![ReconcileIssue::DuplicateId { id: 1 }]);
        assert_eq!(registry.get(1).unwrap().target_position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(backend.spawned.len(), 1);
    }

    #[test]
    fn test_traffic_light_scenario() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        run(
            &mut registry,
            &mut backend,
            &[AgentRecord::new(2, "TrafficLight", 0.0, 0.0)
                .with_state("red")
                .with_direction("NS")],
        );
        let light = registry.get(2).unwrap();
        let lamps = light.appearance.lamps().unwrap();
        assert_eq!(lamps.active(), LampState::Red);
        assert!(!lamps.is_lit(LampState::Green));
        assert!(!lamps.is_lit(LampState::Yellow));
        assert!(light.target_rotation.abs_diff_eq(yaw_rotation(0.0), 1e-6));

        run(
            &mut registry,
            &mut backend,
            &[AgentRecord::new(2, "TrafficLight", 0.0, 0.0)
                .with_state("GREEN")
                .with_direction("EW")],
        );
        let light = registry.get(2).unwrap();
        assert_eq!(light.appearance.lamps().unwrap().active(), LampState::Green);
        assert!(light.target_rotation.abs_diff_eq(yaw_rotation(90.0), 1e-6));
    }

    #[test]
    fn test_unrecognized_light_state_keeps_lamp() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();
        let light = |state: &str| AgentRecord::new(2, "TrafficLight", 0.0, 0.0).with_state(state);

        run(&mut registry, &mut backend, &[light("yellow")]);
        let report = run(&mut registry, &mut backend, &[light("purple")]);

        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            registry.get(2).unwrap().appearance.lamps().unwrap().active(),
            LampState::Yellow
        );
        assert_eq!(registry.get(2).unwrap().last_state.as_deref(), Some("purple"));
    }

    #[test]
    fn test_initial_heading() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        run(
            &mut registry,
            &mut backend,
            &[
                AgentRecord::new(1, "Car", 0.0, 0.0).with_direction("East"),
                AgentRecord::new(2, "Car", 0.0, 0.0).with_direction("West"),
                AgentRecord::new(3, "Car", 0.0, 0.0),
            ],
        );

        let east = registry.get(1).unwrap();
        assert!(east.rendered_rotation.abs_diff_eq(yaw_rotation(90.0), 1e-6));
        assert!(east.target_rotation.abs_diff_eq(yaw_rotation(90.0), 1e-6));
        let west = registry.get(2).unwrap();
        assert!(west.rendered_rotation.abs_diff_eq(yaw_rotation(270.0), 1e-6));
        assert_eq!(registry.get(3).unwrap().rendered_rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_vehicle_heading_not_taken_from_later_snapshots() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        run(&mut registry, &mut backend, &[AgentRecord::new(1, "Car", 0.0, 0.0).with_direction("North")]);
        run(&mut registry, &mut backend, &[AgentRecord::new(1, "Car", 0.0, 1.0).with_direction("South")]);

        assert_eq!(registry.get(1).unwrap().target_rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_unknown_direction_reported() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        let report = run(
            &mut registry,
            &mut backend,
            &[AgentRecord::new(1, "Car", 0.0, 0.0).with_direction("Up")],
        );
        assert!(registry.contains(1));
        assert_eq!(
            report.issues,
            vec![ReconcileIssue::UnknownDirection {
                id: 1,
                direction: "Up".into()
            }]
        );
    }

    #[test]
    fn test_appearance_follows_latest_snapshot() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();

        run(&mut registry, &mut backend, &sync_events::fixtures::intersection_update());
        assert_eq!(registry.get(201).unwrap().appearance.treatment(), Some(Treatment::Alert));
        assert_eq!(registry.get(250).unwrap().appearance.treatment(), Some(Treatment::Flee));
        assert_eq!(registry.get(1).unwrap().appearance.treatment(), Some(Treatment::Civilian));
        assert_eq!(registry.get(400).unwrap().appearance.parking(), Some(ParkingState::Reserved));

        run(&mut registry, &mut backend, &sync_events::fixtures::intersection_next());
        assert_eq!(registry.get(201).unwrap().appearance.treatment(), Some(Treatment::Arrest));
        assert_eq!(
            registry.get(250).unwrap().appearance.treatment(),
            Some(Treatment::Neutralized)
        );
        assert_eq!(registry.get(400).unwrap().appearance.parking(), Some(ParkingState::Occupied));
    }

    #[test]
    fn test_ground_height_and_plane_mapping() {
        let mut registry = Registry::new();
        let mut backend = RecordingBackend::default();
        let config = PresentationConfig {
            ground_height: 0.5,
            ..Default::default()
        };

        reconcile(
            &mut registry,
            &config,
            &[AgentRecord::new(1, "Car", 3.0, 4.0)],
            &mut backend,
        );
        assert_eq!(registry.get(1).unwrap().target_position, Vec3::new(3.0, 0.5, 4.0));
        assert_eq!(backend.spawned[0].position, Vec3::new(3.0, 0.5, 4.0));
        assert_eq!(backend.spawned[0].name(), "Car_1");
    }
}
