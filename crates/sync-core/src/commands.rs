//! Outgoing step commands and link status.
//!
//! The simulation only advances when told to. A [`CommandEmitter`] asks for
//! a step on a fixed render-time cadence, whether or not snapshots arrive.
//! Sends are never queued or retried; a step that cannot go out is dropped
//! and reported as such.

use bevy_ecs::prelude::*;

use sync_events::Command;

use crate::dispatch::LinkEvent;

/// Connection state as last reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Connecting,
    Open,
    Closed,
}

/// Link status tracked on the tick side from [`LinkEvent`]s.
#[derive(Resource, Debug, Clone, Default)]
pub struct LinkStatus {
    pub state: LinkState,
    /// Most recent transport error, if any.
    pub last_error: Option<String>,
    /// Number of times the link has opened.
    pub connections: u32,
    /// Most recent decode failure, if any.
    pub last_decode_error: Option<String>,
    pub decode_failures: u64,
}

impl LinkStatus {
    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Applies a lifecycle notification and logs it.
    pub fn apply(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Opened => {
                self.state = LinkState::Open;
                self.connections += 1;
                tracing::info!("Connected to simulation");
            }
            LinkEvent::Closed => {
                self.state = LinkState::Closed;
                tracing::info!("Simulation connection closed");
            }
            LinkEvent::Error(message) => {
                self.last_error = Some(message.clone());
                tracing::error!("Simulation connection error: {}", message);
            }
            // Already logged by the transport when the message was dropped
            LinkEvent::DecodeFailed(message) => {
                self.last_decode_error = Some(message.clone());
                self.decode_failures += 1;
            }
        }
    }
}

/// Why a command did not reach the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The link is not open.
    Disconnected,
    /// The transport has shut down.
    TransportGone,
}

/// Observable result of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped(DropReason),
}

/// The transport has stopped accepting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Anything that can carry commands to the simulation.
pub trait CommandSink {
    fn submit(&self, command: Command) -> Result<(), SinkClosed>;
}

/// Sends a command if the link is open.
pub fn send_command<S: CommandSink + ?Sized>(
    sink: &S,
    link: &LinkStatus,
    command: Command,
) -> SendOutcome {
    if !link.is_open() {
        return SendOutcome::Dropped(DropReason::Disconnected);
    }
    match sink.submit(command) {
        Ok(()) => SendOutcome::Sent,
        Err(SinkClosed) => SendOutcome::Dropped(DropReason::TransportGone),
    }
}

/// Render-time accumulator that fires once per interval.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCadence {
    interval: f32,
    elapsed: f32,
}

impl StepCadence {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Adds `dt` seconds; returns true and restarts when the interval is reached.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}

/// Emits step commands on a fixed cadence and counts the outcomes.
#[derive(Resource, Debug, Clone)]
pub struct CommandEmitter {
    cadence: StepCadence,
    pub sent: u64,
    pub dropped: u64,
    pub last_outcome: Option<SendOutcome>,
}

impl CommandEmitter {
    pub fn new(step_interval: f32) -> Self {
        Self {
            cadence: StepCadence::new(step_interval),
            sent: 0,
            dropped: 0,
            last_outcome: None,
        }
    }

    /// Advances the cadence and sends a step when it fires.
    pub fn tick<S: CommandSink + ?Sized>(
        &mut self,
        dt: f32,
        link: &LinkStatus,
        sink: &S,
    ) -> Option<SendOutcome> {
        if !self.cadence.advance(dt) {
            return None;
        }
        let outcome = send_command(sink, link, Command::Step);
        match outcome {
            SendOutcome::Sent => self.sent += 1,
            SendOutcome::Dropped(reason) => {
                self.dropped += 1;
                tracing::debug!("Step command dropped: {:?}", reason);
            }
        }
        self.last_outcome = Some(outcome);
        Some(outcome)
    }
}
