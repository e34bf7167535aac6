//! Snapshot-driven entity synchronization.
//!
//! Keeps a local registry of visual entities consistent with the agent
//! snapshots published by the authoritative simulation, and smooths their
//! on-screen state between snapshots.
//!
//! # Modules
//!
//! - [`dispatch`]: Queue carrying snapshots from the transport thread to the tick
//! - [`reconcile`]: Create/update/destroy from one snapshot
//! - [`registry`]: Tracked entities keyed by agent id
//! - [`presentation`]: Frame-rate independent smoothing
//! - [`appearance`]: Traffic light, vehicle and parking slot state machines
//! - [`commands`]: Step cadence and link status
//! - [`config`]: TOML configuration

pub mod appearance;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod presentation;
pub mod reconcile;
pub mod registry;

pub use appearance::{
    vehicle_treatment, Appearance, LampState, ParkingState, TrafficLightLamps, Treatment,
    UnrecognizedState, VehicleClass,
};
pub use commands::{
    send_command, CommandEmitter, CommandSink, DropReason, LinkState, LinkStatus, SendOutcome,
    SinkClosed, StepCadence,
};
pub use config::{
    default_config_toml, CadenceConfig, ClientConfig, ConfigError, ConnectionConfig,
    PresentationConfig,
};
pub use dispatch::{dispatch_channel, Delivery, DispatchQueue, DispatchSender, LinkEvent};
pub use engine::SyncEngine;
pub use reconcile::{ReconcileIssue, ReconcileReport, SpawnRequest, VisualBackend};
pub use registry::{OrientationSource, Registry, TrackedEntity};
