//! Sample data fixtures for testing.
//!
//! This module provides ready-made snapshots for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // sync-events = { path = "../sync-events", features = ["test-fixtures"] }
//!
//! use sync_events::fixtures;
//!
//! let first = fixtures::intersection_update();
//! let second = fixtures::intersection_next();
//! ```

use crate::{decode_message, AgentRecord, Decoded};

fn expect_update(raw: &str, name: &str) -> Vec<AgentRecord> {
    match decode_message(raw) {
        Ok(Decoded::Update(agents)) => agents,
        other => panic!("{} is not an update message: {:?}", name, other),
    }
}

/// Returns the first intersection snapshot.
///
/// Contains 8 agents:
/// - 1 plain car heading north
/// - 2 traffic lights (red on NS, green on EW)
/// - 1 police car chasing, 1 chaotic car escaping
/// - 1 obstacle
/// - 2 parking slots (reserved, free)
pub fn intersection_update() -> Vec<AgentRecord> {
    expect_update(
        include_str!("../tests/fixtures/intersection_update.json"),
        "intersection_update.json",
    )
}

/// Returns the snapshot that follows [`intersection_update`].
///
/// The obstacle is gone, the lights have swapped, the police car is
/// arresting, one slot is occupied, and an agent of unknown type `Blimp`
/// appears.
pub fn intersection_next() -> Vec<AgentRecord> {
    expect_update(
        include_str!("../tests/fixtures/intersection_next.json"),
        "intersection_next.json",
    )
}

/// Returns raw lines of a stream mixing updates, ignored and malformed messages.
pub fn mixed_stream_lines() -> Vec<&'static str> {
    include_str!("../tests/fixtures/mixed_stream.jsonl")
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect()
}
