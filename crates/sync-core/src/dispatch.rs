//! Dispatch queue between the transport thread and the presentation tick.
//!
//! The transport owns a [`DispatchSender`] and enqueues decoded snapshots and
//! link notifications from its own thread. The tick owns the single
//! [`DispatchQueue`] and drains it once per frame, in arrival order. Nothing
//! else crosses the thread boundary on the inbound side.

use bevy_ecs::prelude::*;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Mutex;

use sync_events::AgentRecord;

/// Connection lifecycle notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Closed,
    Error(String),
    /// An inbound message was dropped because it could not be decoded.
    DecodeFailed(String),
}

/// One item handed from the transport to the tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Snapshot(Vec<AgentRecord>),
    Link(LinkEvent),
}

/// Producer half, cloneable and owned by the transport thread.
#[derive(Debug, Clone)]
pub struct DispatchSender {
    tx: Sender<Delivery>,
}

impl DispatchSender {
    /// Enqueues a snapshot. Returns false once the consumer is gone.
    pub fn send_snapshot(&self, records: Vec<AgentRecord>) -> bool {
        self.tx.send(Delivery::Snapshot(records)).is_ok()
    }

    /// Enqueues a link notification. Returns false once the consumer is gone.
    pub fn send_link(&self, event: LinkEvent) -> bool {
        self.tx.send(Delivery::Link(event)).is_ok()
    }
}

/// Consumer half, drained by the presentation tick.
#[derive(Resource)]
pub struct DispatchQueue {
    /// Receiver (wrapped for thread safety).
    rx: Mutex<Receiver<Delivery>>,
}

impl DispatchQueue {
    /// Takes every pending delivery, oldest first.
    pub fn drain(&self) -> Vec<Delivery> {
        let mut pending = Vec::new();
        let Ok(rx) = self.rx.lock() else {
            tracing::error!("Dispatch queue lock poisoned, dropping this frame's deliveries");
            return pending;
        };
        loop {
            match rx.try_recv() {
                Ok(delivery) => pending.push(delivery),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        pending
    }
}

/// Creates a connected sender/queue pair.
pub fn dispatch_channel() -> (DispatchSender, DispatchQueue) {
    let (tx, rx) = mpsc::channel();
    (
        DispatchSender { tx },
        DispatchQueue { rx: Mutex::new(rx) },
    )
}
