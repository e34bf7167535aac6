//! Agent Records
//!
//! Wire-level agent records as published by the simulation in each
//! `update` message, plus the closed vocabularies they are parsed into.
//!
//! # Example
//!
//! ```
//! use sync_events::{AgentKind, AgentRecord, Direction, LightAxis};
//!
//! let record = AgentRecord::new(2, "TrafficLight", 4.0, 7.0)
//!     .with_state("red")
//!     .with_direction("NS");
//! assert_eq!(record.kind(), Ok(AgentKind::TrafficLight));
//! assert_eq!(record.direction(), Ok(Some(Direction::Axis(LightAxis::NorthSouth))));
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable agent identity assigned by the simulation.
pub type AgentId = i64;

/// Kind of agent, fixed for the lifetime of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "Car")]
    Vehicle,
    #[serde(rename = "PoliceCar")]
    PoliceVehicle,
    #[serde(rename = "ChaoticCar")]
    ChaoticVehicle,
    TrafficLight,
    Obstacle,
    Destination,
}

impl AgentKind {
    /// Name used for this kind on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AgentKind::Vehicle => "Car",
            AgentKind::PoliceVehicle => "PoliceCar",
            AgentKind::ChaoticVehicle => "ChaoticCar",
            AgentKind::TrafficLight => "TrafficLight",
            AgentKind::Obstacle => "Obstacle",
            AgentKind::Destination => "Destination",
        }
    }

    /// Whether agents of this kind drive around the map.
    pub fn is_vehicle(&self) -> bool {
        matches!(
            self,
            AgentKind::Vehicle | AgentKind::PoliceVehicle | AgentKind::ChaoticVehicle
        )
    }

    /// Returns all agent kinds.
    pub fn all() -> &'static [AgentKind] {
        &[
            AgentKind::Vehicle,
            AgentKind::PoliceVehicle,
            AgentKind::ChaoticVehicle,
            AgentKind::TrafficLight,
            AgentKind::Obstacle,
            AgentKind::Destination,
        ]
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// An `agent_type` value outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown agent type: '{0}'")]
pub struct UnknownAgentKind(pub String);

impl FromStr for AgentKind {
    type Err = UnknownAgentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::all()
            .iter()
            .copied()
            .find(|kind| kind.wire_name() == s)
            .ok_or_else(|| UnknownAgentKind(s.to_string()))
    }
}

/// Cardinal heading of a moving agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    /// Yaw about the vertical axis, in degrees.
    pub fn yaw_degrees(&self) -> f32 {
        match self {
            Heading::North => 0.0,
            Heading::East => 90.0,
            Heading::South => 180.0,
            Heading::West => 270.0,
        }
    }
}

/// Axis a traffic light controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightAxis {
    NorthSouth,
    EastWest,
}

impl LightAxis {
    /// Yaw about the vertical axis, in degrees.
    pub fn yaw_degrees(&self) -> f32 {
        match self {
            LightAxis::NorthSouth => 0.0,
            LightAxis::EastWest => 90.0,
        }
    }
}

/// Parsed `direction` field of an agent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Heading(Heading),
    Axis(LightAxis),
}

/// A `direction` value outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction: '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "North" => Ok(Direction::Heading(Heading::North)),
            "East" => Ok(Direction::Heading(Heading::East)),
            "South" => Ok(Direction::Heading(Heading::South)),
            "West" => Ok(Direction::Heading(Heading::West)),
            "NS" => Ok(Direction::Axis(LightAxis::NorthSouth)),
            "EW" => Ok(Direction::Axis(LightAxis::EastWest)),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// One agent as seen by the simulation at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub x: f32,
    pub y: f32,
    pub agent_type: String,
    /// Any JSON scalar is accepted and kept as its text form.
    #[serde(
        default,
        deserialize_with = "state_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

fn state_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<Value>::deserialize(deserializer)?.map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        }),
    )
}

impl AgentRecord {
    /// Creates a record without state or direction.
    pub fn new(id: AgentId, agent_type: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            agent_type: agent_type.into(),
            state: None,
            direction: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    /// Parses the agent type into the closed kind vocabulary.
    pub fn kind(&self) -> Result<AgentKind, UnknownAgentKind> {
        self.agent_type.parse()
    }

    /// Parses the optional direction field.
    pub fn direction(&self) -> Result<Option<Direction>, UnknownDirection> {
        self.direction
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(str::parse)
            .transpose()
    }

    /// Semantic state, treating an empty string as absent.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref().filter(|s| !s.is_empty())
    }
}
