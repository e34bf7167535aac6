//! Entity registry: the local mirror of every live simulation agent.

use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use std::collections::HashMap;

use sync_events::{AgentId, AgentKind};

use crate::appearance::Appearance;

/// Where an entity's orientation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSource {
    /// Derived each tick from the direction of travel.
    Motion,
    /// Taken as-is from the latest snapshot.
    Snapshot,
}

impl OrientationSource {
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::TrafficLight => OrientationSource::Snapshot,
            _ => OrientationSource::Motion,
        }
    }
}

/// Mirror of one simulation agent and its visual.
#[derive(Debug, Clone)]
pub struct TrackedEntity {
    id: AgentId,
    kind: AgentKind,
    /// The visual spawned for this agent.
    visual: Entity,
    /// Position currently shown on screen.
    pub rendered_position: Vec3,
    /// Orientation currently shown on screen.
    pub rendered_rotation: Quat,
    /// Last position reported by the simulation.
    pub target_position: Vec3,
    /// Last orientation reported by the simulation.
    pub target_rotation: Quat,
    pub orientation: OrientationSource,
    /// Yaw applied on top of the travel direction, in radians.
    pub heading_offset: f32,
    /// Raw state string from the latest snapshot.
    pub last_state: Option<String>,
    pub appearance: Appearance,
}

impl TrackedEntity {
    /// Creates an entity whose rendered state starts at its target state.
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        visual: Entity,
        position: Vec3,
        rotation: Quat,
        heading_offset: f32,
    ) -> Self {
        Self {
            id,
            kind,
            visual,
            rendered_position: position,
            rendered_rotation: rotation,
            target_position: position,
            target_rotation: rotation,
            orientation: OrientationSource::for_kind(kind),
            heading_offset,
            last_state: None,
            appearance: Appearance::for_kind(kind),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn visual(&self) -> Entity {
        self.visual
    }
}

/// Map of agent identity to tracked entity.
#[derive(Debug, Default)]
pub struct Registry {
    entities: HashMap<AgentId, TrackedEntity>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AgentId) -> Option<&TrackedEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut TrackedEntity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Inserts a new entity. Returns the entity back if its id is taken.
    pub fn insert(&mut self, entity: TrackedEntity) -> Result<(), TrackedEntity> {
        if self.entities.contains_key(&entity.id) {
            return Err(entity);
        }
        self.entities.insert(entity.id, entity);
        Ok(())
    }

    pub fn remove(&mut self, id: AgentId) -> Option<TrackedEntity> {
        self.entities.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registered ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.entities.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedEntity> {
        self.entities.values_mut()
    }
}
