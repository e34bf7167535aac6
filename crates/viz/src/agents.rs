//! Mirrored agents: snapshot intake, presentation, and step commands.

use bevy::prelude::*;
use std::sync::Mutex;

use sync_core::{
    dispatch_channel, ClientConfig, CommandEmitter, DispatchQueue, DispatchSender, LinkEvent,
    LinkState, LinkStatus, ReconcileReport, SyncEngine,
};

use crate::transport::{spawn_transport, OutboundSender};
use crate::visuals::{AgentVisual, CommandsBackend, PrefabLibrary};

/// Plugin that keeps agent visuals in sync with the simulation.
pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        // ClientConfig should be inserted by main.rs before adding this plugin
        if !app.world().contains_resource::<ClientConfig>() {
            app.init_resource::<ClientConfig>();
        }
        let config = app.world().resource::<ClientConfig>().clone();
        let (dispatch, queue) = dispatch_channel();

        app.insert_resource(queue)
            .insert_resource(PendingLink(Mutex::new(Some(dispatch))))
            .insert_resource(SyncEngine::new(config.presentation.clone()))
            .insert_resource(CommandEmitter::new(config.cadence.step_interval_secs))
            .init_resource::<LinkStatus>()
            .add_event::<SnapshotApplied>()
            .configure_sets(
                Update,
                (MirrorSet::Reconcile, MirrorSet::Appearance, MirrorSet::Present).chain(),
            )
            .add_systems(Startup, start_link)
            .add_systems(
                Update,
                (
                    drain_dispatch_queue.in_set(MirrorSet::Reconcile),
                    present_agents.in_set(MirrorSet::Present),
                    emit_step_commands,
                ),
            )
            .add_systems(Last, close_link_on_exit);
    }
}

/// Ordering of the per-frame mirror work.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorSet {
    /// Drain the dispatch queue and reconcile.
    Reconcile,
    /// Push state machine results onto materials.
    Appearance,
    /// Interpolate and write transforms.
    Present,
}

/// Emitted once for every snapshot applied to the registry.
#[derive(Event, Debug, Clone)]
pub struct SnapshotApplied(pub ReconcileReport);

/// Dispatch sender waiting for the link thread to start.
#[derive(Resource)]
struct PendingLink(Mutex<Option<DispatchSender>>);

/// System to start the link thread on launch.
fn start_link(
    mut commands: Commands,
    config: Res<ClientConfig>,
    pending: Res<PendingLink>,
    mut link: ResMut<LinkStatus>,
) {
    let dispatch = match pending.0.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    let Some(dispatch) = dispatch else {
        tracing::error!("Link already started or dispatch sender unavailable");
        return;
    };

    match spawn_transport(config.connection.clone(), dispatch) {
        Ok(outbound) => {
            commands.insert_resource(outbound);
        }
        Err(err) => {
            link.apply(&LinkEvent::Error(err.to_string()));
            link.state = LinkState::Closed;
        }
    }
    commands.remove_resource::<PendingLink>();
}

/// System to apply every pending snapshot, in arrival order.
pub(crate) fn drain_dispatch_queue(
    mut commands: Commands,
    queue: Res<DispatchQueue>,
    prefabs: Option<Res<PrefabLibrary>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut engine: ResMut<SyncEngine>,
    mut link: ResMut<LinkStatus>,
    mut applied: EventWriter<SnapshotApplied>,
) {
    let Some(prefabs) = prefabs else {
        return;
    };

    let mut backend = CommandsBackend {
        commands: &mut commands,
        prefabs: &prefabs,
        materials: &mut materials,
    };
    let reports = engine.drain_queue(&queue, &mut link, &mut backend);
    applied.send_batch(reports.into_iter().map(SnapshotApplied));
}

/// System to advance interpolation and write the result to transforms.
fn present_agents(
    time: Res<Time>,
    mut engine: ResMut<SyncEngine>,
    mut transforms: Query<&mut Transform, With<AgentVisual>>,
) {
    engine.present(time.delta_seconds());

    for tracked in engine.registry().iter() {
        if let Ok(mut transform) = transforms.get_mut(tracked.visual()) {
            transform.translation = tracked.rendered_position;
            transform.rotation = tracked.rendered_rotation;
        }
    }
}

/// System to request simulation steps on the configured cadence.
fn emit_step_commands(
    time: Res<Time>,
    link: Res<LinkStatus>,
    outbound: Option<Res<OutboundSender>>,
    mut emitter: ResMut<CommandEmitter>,
) {
    let Some(outbound) = outbound else {
        return;
    };
    emitter.tick(time.delta_seconds(), &link, outbound.as_ref());
}

/// System to close the connection once when the app exits.
fn close_link_on_exit(
    mut exits: EventReader<AppExit>,
    outbound: Option<Res<OutboundSender>>,
    mut closed: Local<bool>,
) {
    if exits.read().next().is_none() || *closed {
        return;
    }
    *closed = true;

    if let Some(outbound) = outbound {
        if outbound.close() {
            tracing::info!("Closing simulation connection");
        }
    }
}
