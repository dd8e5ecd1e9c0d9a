//! Wire protocol for the companion process link
//!
//! Everything that crosses a process boundary is defined here: the
//! newline-delimited JSON lines exchanged with the companion over its
//! standard streams, and the payloads relayed on the cross-instance
//! messaging channel.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{SharedError, SharedResult};

/// A host event serialized for the companion: `{"event": <name>, "args": [...]}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventMessage {
    pub event: String,
    pub args: Vec<String>,
}

/// One message queued for delivery to the companion's stdin.
///
/// Either a host event with string-coerced arguments, or a raw control
/// object such as the final shutdown line.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    Event(EventMessage),
    Control(Value),
}

impl OutboundMessage {
    /// Build an event message from a name and its argument vector.
    pub fn event(name: impl Into<String>, args: Vec<String>) -> Self {
        OutboundMessage::Event(EventMessage {
            event: name.into(),
            args,
        })
    }

    /// The `{"event":"shutdown"}` control line sent during bridge teardown.
    pub fn shutdown() -> Self {
        OutboundMessage::Control(json!({ "event": "shutdown" }))
    }

    /// The JSON object written to the wire.
    pub fn to_json(&self) -> Value {
        match self {
            OutboundMessage::Event(msg) => json!({
                "event": msg.event,
                "args": msg.args,
            }),
            OutboundMessage::Control(value) => value.clone(),
        }
    }

    /// Serialize to a single wire line (no trailing newline).
    pub fn to_line(&self) -> SharedResult<String> {
        serde_json::to_string(&self.to_json()).map_err(|e| SharedError::SerializationError {
            message: e.to_string(),
        })
    }
}

/// A command received from the companion, resolved from its `action` field.
///
/// The set is closed on the host side but open on the wire: an
/// unrecognized action resolves to `Unknown` rather than an error, so
/// newer companions keep working against older hosts.
#[derive(Clone, Debug, PartialEq)]
pub enum ChildCommand {
    /// Deliver a rich-text message to every connected player.
    Broadcast { message: String },
    /// Deliver a rich-text message to one named player (wire action `sendMessage`).
    Whisper { player: String, message: String },
    /// Log a line on the host console.
    Console { message: String },
    /// Forward-compatibility escape hatch.
    Unknown { action: String },
}

impl ChildCommand {
    /// Resolve one wire line into a command.
    ///
    /// Fails on malformed JSON, a missing `action` field, or a recognized
    /// action missing its required fields. Unknown actions succeed.
    pub fn parse(line: &str) -> SharedResult<ChildCommand> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| SharedError::DeserializationError {
                message: e.to_string(),
            })?;

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| SharedError::ProtocolError {
                message: "missing action field".to_string(),
            })?;

        match action {
            "broadcast" => Ok(ChildCommand::Broadcast {
                message: required_str(&value, "message")?,
            }),
            "sendMessage" => Ok(ChildCommand::Whisper {
                player: required_str(&value, "player")?,
                message: required_str(&value, "message")?,
            }),
            "console" => Ok(ChildCommand::Console {
                message: required_str(&value, "message")?,
            }),
            other => Ok(ChildCommand::Unknown {
                action: other.to_string(),
            }),
        }
    }
}

fn required_str(value: &Value, field: &str) -> SharedResult<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SharedError::ProtocolError {
            message: format!("missing {field} field"),
        })
}

/// Payload relayed on the cross-instance messaging channel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChannelEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    /// Wall-clock milliseconds since the epoch.
    pub timestamp: i64,
    pub args: Vec<String>,
}

impl ChannelEvent {
    pub fn new(event: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: "event".to_string(),
            event: event.into(),
            timestamp: Utc::now().timestamp_millis(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_round_trips_name_and_args_in_order() {
        let msg = OutboundMessage::event(
            "BlockBreak",
            vec!["Alice".to_string(), "STONE".to_string()],
        );
        let line = msg.to_line().unwrap();

        let decoded: EventMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(decoded.event, "BlockBreak");
        assert_eq!(decoded.args, vec!["Alice", "STONE"]);
    }

    #[test]
    fn shutdown_control_line_is_bare() {
        let line = OutboundMessage::shutdown().to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({ "event": "shutdown" }));
        assert!(value.get("args").is_none());
    }

    #[test]
    fn parse_broadcast() {
        let cmd = ChildCommand::parse(r#"{"action":"broadcast","message":"<green>hi"}"#).unwrap();
        assert_eq!(
            cmd,
            ChildCommand::Broadcast {
                message: "<green>hi".to_string()
            }
        );
    }

    #[test]
    fn parse_whisper_requires_player() {
        let cmd =
            ChildCommand::parse(r#"{"action":"sendMessage","player":"Alice","message":"<red>hi"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            ChildCommand::Whisper {
                player: "Alice".to_string(),
                message: "<red>hi".to_string()
            }
        );

        let missing = ChildCommand::parse(r#"{"action":"sendMessage","message":"hi"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn parse_unknown_action_is_not_an_error() {
        let cmd = ChildCommand::parse(r#"{"action":"teleport","target":"spawn"}"#).unwrap();
        assert_eq!(
            cmd,
            ChildCommand::Unknown {
                action: "teleport".to_string()
            }
        );
    }

    #[test]
    fn parse_rejects_missing_action_and_malformed_json() {
        assert!(ChildCommand::parse(r#"{"message":"hi"}"#).is_err());
        assert!(ChildCommand::parse("not json").is_err());
    }

    #[test]
    fn channel_event_serializes_with_type_tag() {
        let payload = ChannelEvent::new("PlayerJoin", vec!["Alice".to_string()]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["event"], "PlayerJoin");
        assert_eq!(value["args"][0], "Alice");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }
}
