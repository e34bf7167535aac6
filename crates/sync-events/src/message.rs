//! Wire Messages
//!
//! Inbound snapshot messages from the simulation and outbound commands sent
//! back to it. Both directions are JSON text frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::AgentRecord;

/// Discriminator of the only inbound message this client acts on.
pub const UPDATE_MESSAGE: &str = "update";

/// Result of decoding one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A full snapshot of the live agents, in simulation order.
    Update(Vec<AgentRecord>),
    /// A well-formed message with a discriminator this client ignores.
    Ignored { message_type: String },
}

/// Errors produced while decoding an inbound message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no string 'type' field")]
    MissingType,
    #[error("update message has no 'agents' array")]
    MissingAgents,
    #[error("invalid agent list: {0}")]
    InvalidAgents(serde_json::Error),
}

/// Decodes one raw text message.
pub fn decode_message(raw: &str) -> Result<Decoded, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let message_type = match object.get("type") {
        Some(Value::String(t)) => t.clone(),
        _ => return Err(DecodeError::MissingType),
    };

    if message_type != UPDATE_MESSAGE {
        return Ok(Decoded::Ignored { message_type });
    }

    let agents = match object.remove("agents") {
        Some(agents @ Value::Array(_)) => agents,
        _ => return Err(DecodeError::MissingAgents),
    };

    serde_json::from_value(agents)
        .map(Decoded::Update)
        .map_err(DecodeError::InvalidAgents)
}

/// Commands sent from the client to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Ask the simulation to advance one step.
    Step,
}

impl Command {
    /// Serializes the command as a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_update() {
        let raw = r#"{"type":"update","agents":[
            {"id":1,"x":0.0,"y":0.0,"agent_type":"Car"},
            {"id":2,"x":3.0,"y":4.0,"agent_type":"TrafficLight","state":"red","direction":"NS"}
        ]}"#;
        let Decoded::Update(agents) = decode_message(raw).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].id, 1);
        assert_eq!(agents[1].state(), Some("red"));
        assert_eq!(agents[1].direction.as_deref(), Some("NS"));
    }

    #[test]
    fn test_numeric_state_does_not_fail_the_update() {
        let raw = r#"{"type":"update","agents":[
            {"id":1,"x":0.0,"y":0.0,"agent_type":"Car"},
            {"id":250,"x":2.0,"y":2.0,"agent_type":"ChaoticCar","state":3}
        ]}"#;
        let Decoded::Update(agents) = decode_message(raw).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[1].state(), Some("3"));
    }

    #[test]
    fn test_decode_preserves_order() {
        let raw = r#"{"type":"update","agents":[
            {"id":9,"x":0,"y":0,"agent_type":"Car"},
            {"id":3,"x":0,"y":0,"agent_type":"Car"},
            {"id":5,"x":0,"y":0,"agent_type":"Car"}
        ]}"#;
        let Decoded::Update(agents) = decode_message(raw).unwrap() else {
            panic!("expected update");
        };
        let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }

    #[test]
    fn test_decode_empty_update() {
        let decoded = decode_message(r#"{"type":"update","agents":[]}"#).unwrap();
        assert_eq!(decoded, Decoded::Update(Vec::new()));
    }

    #[test]
    fn test_other_types_are_ignored() {
        let decoded = decode_message(r#"{"type":"stats","agents":"whatever"}"#).unwrap();
        assert_eq!(
            decoded,
            Decoded::Ignored {
                message_type: "stats".to_string()
            }
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_message("{not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_message("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode_message(r#"{"agents":[]}"#), Err(DecodeError::MissingType)));
        assert!(matches!(
            decode_message(r#"{"type":"update"}"#),
            Err(DecodeError::MissingAgents)
        ));
        assert!(matches!(
            decode_message(r#"{"type":"update","agents":[{"id":"one"}]}"#),
            Err(DecodeError::InvalidAgents(_))
        ));
    }

    #[test]
    fn test_step_command_json() {
        assert_eq!(Command::Step.to_json().unwrap(), r#"{"type":"step"}"#);
    }
}
