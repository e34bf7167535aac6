//! Shared wire types for the traffic mirror client.
//!
//! This crate contains pure data structures and the message decoder, with no
//! rendering or engine logic. Every other crate in the workspace depends on it.

pub mod agent;
pub mod message;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use agent::{
    AgentId, AgentKind, AgentRecord, Direction, Heading, LightAxis, UnknownAgentKind,
    UnknownDirection,
};
pub use message::{decode_message, Command, DecodeError, Decoded, UPDATE_MESSAGE};
