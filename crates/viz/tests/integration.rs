//! Integration tests for the visualization layer.

use bevy::prelude::{Entity, Quat, Vec3};
use std::collections::HashMap;

use sync_core::{
    dispatch_channel, LampState, LinkStatus, ParkingState, ReconcileIssue, SpawnRequest,
    SyncEngine, Treatment, VisualBackend,
};
use sync_events::fixtures;
use viz::transport::forward_message;

/// Stands in for the Bevy scene, keyed by visual name.
#[derive(Default)]
struct SceneStub {
    next: u32,
    live: HashMap<Entity, String>,
}

impl VisualBackend for SceneStub {
    fn spawn(&mut self, request: &SpawnRequest) -> Option<Entity> {
        self.next += 1;
        let entity = Entity::from_raw(self.next);
        self.live.insert(entity, request.name());
        Some(entity)
    }

    fn release(&mut self, visual: Entity) {
        self.live.remove(&visual);
    }
}

impl SceneStub {
    fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.live.values().cloned().collect();
        names.sort();
        names
    }
}

fn pipe_stream(lines: &[&str], engine: &mut SyncEngine, scene: &mut SceneStub) -> LinkStatus {
    let (tx, queue) = dispatch_channel();
    for line in lines {
        assert!(forward_message(line, &tx));
    }
    let mut link = LinkStatus::default();
    engine.drain_queue(&queue, &mut link, scene);
    link
}

/// Test the full inbound path on the intersection fixtures.
#[test]
fn test_intersection_stream() {
    let first = include_str!("../../sync-events/tests/fixtures/intersection_update.json");
    let second = include_str!("../../sync-events/tests/fixtures/intersection_next.json");

    let mut engine = SyncEngine::default();
    let mut scene = SceneStub::default();

    pipe_stream(&[first.trim()], &mut engine, &mut scene);
    assert_eq!(
        scene.names(),
        vec![
            "Car_1",
            "ChaoticCar_250",
            "Destination_400",
            "Destination_401",
            "Obstacle_300",
            "PoliceCar_201",
            "TrafficLight_2",
            "TrafficLight_3",
        ]
    );

    let registry = engine.registry();
    assert_eq!(
        registry.get(2).unwrap().appearance.lamps().unwrap().active(),
        LampState::Red
    );
    assert_eq!(
        registry.get(201).unwrap().appearance.treatment(),
        Some(Treatment::Alert)
    );
    assert_eq!(
        registry.get(250).unwrap().appearance.treatment(),
        Some(Treatment::Flee)
    );
    assert_eq!(
        registry.get(400).unwrap().appearance.parking(),
        Some(ParkingState::Reserved)
    );

    pipe_stream(&[second.trim()], &mut engine, &mut scene);

    // Obstacle gone, the Blimp never gets a visual
    assert!(!scene.names().contains(&"Obstacle_300".to_string()));
    assert!(!scene.names().iter().any(|n| n.starts_with("Blimp")));
    assert_eq!(scene.live.len(), engine.registry().len());

    let registry = engine.registry();
    assert_eq!(
        registry.get(2).unwrap().appearance.lamps().unwrap().active(),
        LampState::Green
    );
    assert_eq!(
        registry.get(201).unwrap().appearance.treatment(),
        Some(Treatment::Arrest)
    );
    assert_eq!(
        registry.get(250).unwrap().appearance.treatment(),
        Some(Treatment::Neutralized)
    );
    assert_eq!(
        registry.get(400).unwrap().appearance.parking(),
        Some(ParkingState::Occupied)
    );
    assert_eq!(engine.snapshots_applied(), 2);
}

/// Test that malformed and foreign messages never reach the registry.
#[test]
fn test_mixed_stream_survives_bad_messages() {
    let mut engine = SyncEngine::default();
    let mut scene = SceneStub::default();

    let link = pipe_stream(&fixtures::mixed_stream_lines(), &mut engine, &mut scene);

    // The last update in the stream is empty
    assert!(engine.registry().is_empty());
    assert!(scene.live.is_empty());
    assert!(engine.snapshots_applied() >= 2);
    assert!(link.decode_failures >= 1);
    assert!(link.last_decode_error.is_some());
}

/// Test that the initial heading and traffic light axis come from the snapshot.
#[test]
fn test_initial_orientation_from_direction() {
    let mut engine = SyncEngine::default();
    let mut scene = SceneStub::default();
    engine.reconcile(&fixtures::intersection_update(), &mut scene);
    engine.present(1.0 / 60.0);

    let registry = engine.registry();
    let police = registry.get(201).unwrap();
    assert!(police
        .rendered_rotation
        .abs_diff_eq(Quat::from_rotation_y(90f32.to_radians()), 1e-5));
    assert_eq!(police.rendered_position, Vec3::new(4.0, 0.0, 6.0));

    let ew_light = registry.get(3).unwrap();
    assert!(ew_light
        .rendered_rotation
        .abs_diff_eq(Quat::from_rotation_y(90f32.to_radians()), 1e-5));
}

/// Test that an unknown type is reported but does not block the snapshot.
#[test]
fn test_unknown_type_reported() {
    let mut engine = SyncEngine::default();
    let mut scene = SceneStub::default();
    engine.reconcile(&fixtures::intersection_update(), &mut scene);
    let report = engine.reconcile(&fixtures::intersection_next(), &mut scene);

    assert!(report
        .issues
        .iter()
        .any(|issue| matches!(issue, ReconcileIssue::UnknownKind { id: 500, .. })));
    assert_eq!(report.removed, vec![300]);
}
