//! The synchronization engine.
//!
//! Owns the [`Registry`] and is the only writer to it. It is constructed by
//! the application and handed to systems as a resource; reconciliation and
//! presentation both run on the tick, so no locking is involved.

use bevy_ecs::prelude::*;

use sync_events::AgentRecord;

use crate::commands::LinkStatus;
use crate::config::PresentationConfig;
use crate::dispatch::{Delivery, DispatchQueue};
use crate::presentation::present_entity;
use crate::reconcile::{reconcile, ReconcileReport, VisualBackend};
use crate::registry::Registry;

/// Mirrors the simulation's agents and drives their presentation.
#[derive(Resource, Debug, Default)]
pub struct SyncEngine {
    registry: Registry,
    config: PresentationConfig,
    /// Number of snapshots reconciled so far.
    snapshots_applied: u64,
}

impl SyncEngine {
    pub fn new(config: PresentationConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
            snapshots_applied: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    /// Reconciles the registry against one snapshot.
    pub fn reconcile<V: VisualBackend + ?Sized>(
        &mut self,
        records: &[AgentRecord],
        visuals: &mut V,
    ) -> ReconcileReport {
        let report = reconcile(&mut self.registry, &self.config, records, visuals);
        self.snapshots_applied += 1;

        if report.changed_membership() {
            tracing::debug!(
                "Snapshot {}: {} created, {} removed, {} live",
                self.snapshots_applied,
                report.created.len(),
                report.removed.len(),
                self.registry.len()
            );
        }
        report
    }

    /// Advances every live entity by one presentation tick of `dt` seconds.
    pub fn present(&mut self, dt: f32) {
        for entity in self.registry.iter_mut() {
            present_entity(entity, &self.config, dt);
        }
    }

    /// Applies everything waiting in the dispatch queue, in arrival order.
    pub fn drain_queue<V: VisualBackend + ?Sized>(
        &mut self,
        queue: &DispatchQueue,
        link: &mut LinkStatus,
        visuals: &mut V,
    ) -> Vec<ReconcileReport> {
        let mut reports = Vec::new();
        for delivery in queue.drain() {
            match delivery {
                Delivery::Snapshot(records) => reports.push(self.reconcile(&records, visuals)),
                Delivery::Link(event) => link.apply(&event),
            }
        }
        reports
    }
}
