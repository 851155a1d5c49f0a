//! Protobuf codec for [`ChannelMessage`].
//!
//! Binary websocket frames carry one protobuf `WireMessage` whose `kind`
//! oneof mirrors the closed message set. Identifiers travel as UUID strings
//! and are parsed back on decode, so a malformed id fails at the boundary
//! instead of deep inside room dispatch.

use prost::Message;
use uuid::Uuid;

use crate::message::{ChannelMessage, DrawEvent};
use crate::stroke::{Point, Tool};

/// Error returned by [`decode_message`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireMessage`.
    #[error("failed to decode protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The message decoded but carried no variant.
    #[error("message has no kind")]
    MissingKind,
    /// A UUID field did not parse.
    #[error("invalid uuid in `{field}`: {value:?}")]
    InvalidUuid { field: &'static str, value: String },
    /// The `tool` integer on the wire does not map to a known [`Tool`].
    #[error("invalid tool: {0}")]
    InvalidTool(i32),
}

/// Encode a message into protobuf bytes.
#[must_use]
pub fn encode_message(message: &ChannelMessage) -> Vec<u8> {
    message_to_wire(message).encode_to_vec()
}

/// Decode protobuf bytes into a message.
///
/// # Errors
///
/// Returns [`CodecError`] for malformed bytes, an empty oneof, unparseable
/// identifiers, or an unknown tool value.
pub fn decode_message(bytes: &[u8]) -> Result<ChannelMessage, CodecError> {
    let wire = WireMessage::decode(bytes)?;
    wire_to_message(wire)
}

fn message_to_wire(message: &ChannelMessage) -> WireMessage {
    let kind = match message {
        ChannelMessage::JoinRoom { room_id } => WireKind::JoinRoom(WireRoom { room_id: room_id.to_string() }),
        ChannelMessage::Draw(event) => WireKind::Draw(WireDraw {
            room_id: event.room_id.to_string(),
            stroke_id: event.stroke_id.to_string(),
            from: event.from.map(|id| id.to_string()),
            tool: tool_to_wire(event.tool) as i32,
            color: event.color.clone(),
            line_width: event.line_width,
            points: event
                .points
                .iter()
                .map(|p| WirePoint { x: p.x, y: p.y })
                .collect(),
        }),
        ChannelMessage::LeaveRoom { room_id } => WireKind::LeaveRoom(WireRoom { room_id: room_id.to_string() }),
        ChannelMessage::Joined { room_id, peers } => {
            WireKind::Joined(WireJoined { room_id: room_id.to_string(), peers: *peers })
        }
        ChannelMessage::PeerLeft { room_id, peer } => {
            WireKind::PeerLeft(WirePeerLeft { room_id: room_id.to_string(), peer: peer.to_string() })
        }
        ChannelMessage::Error { code, message } => {
            WireKind::Error(WireError { code: code.clone(), message: message.clone() })
        }
    };
    WireMessage { kind: Some(kind) }
}

fn wire_to_message(wire: WireMessage) -> Result<ChannelMessage, CodecError> {
    let Some(kind) = wire.kind else {
        return Err(CodecError::MissingKind);
    };

    Ok(match kind {
        WireKind::JoinRoom(room) => ChannelMessage::JoinRoom { room_id: parse_uuid("room_id", &room.room_id)? },
        WireKind::Draw(draw) => ChannelMessage::Draw(DrawEvent {
            room_id: parse_uuid("room_id", &draw.room_id)?,
            stroke_id: parse_uuid("stroke_id", &draw.stroke_id)?,
            from: draw
                .from
                .as_deref()
                .map(|s| parse_uuid("from", s))
                .transpose()?,
            tool: tool_from_wire(draw.tool)?,
            color: draw.color,
            line_width: draw.line_width,
            points: draw
                .points
                .into_iter()
                .map(|p| Point::new(p.x, p.y))
                .collect(),
        }),
        WireKind::LeaveRoom(room) => ChannelMessage::LeaveRoom { room_id: parse_uuid("room_id", &room.room_id)? },
        WireKind::Joined(joined) => {
            ChannelMessage::Joined { room_id: parse_uuid("room_id", &joined.room_id)?, peers: joined.peers }
        }
        WireKind::PeerLeft(left) => ChannelMessage::PeerLeft {
            room_id: parse_uuid("room_id", &left.room_id)?,
            peer: parse_uuid("peer", &left.peer)?,
        },
        WireKind::Error(err) => ChannelMessage::Error { code: err.code, message: err.message },
    })
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, CodecError> {
    value
        .parse()
        .map_err(|_| CodecError::InvalidUuid { field, value: value.to_owned() })
}

fn tool_to_wire(tool: Tool) -> WireTool {
    match tool {
        Tool::Brush => WireTool::Brush,
        Tool::Eraser => WireTool::Eraser,
        Tool::Text => WireTool::Text,
    }
}

fn tool_from_wire(value: i32) -> Result<Tool, CodecError> {
    match WireTool::try_from(value) {
        Ok(WireTool::Brush) => Ok(Tool::Brush),
        Ok(WireTool::Eraser) => Ok(Tool::Eraser),
        Ok(WireTool::Text) => Ok(Tool::Text),
        Err(_) => Err(CodecError::InvalidTool(value)),
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Clone, PartialEq, Message)]
struct WireMessage {
    #[prost(oneof = "WireKind", tags = "1, 2, 3, 4, 5, 6")]
    kind: Option<WireKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
enum WireKind {
    #[prost(message, tag = "1")]
    JoinRoom(WireRoom),
    #[prost(message, tag = "2")]
    Draw(WireDraw),
    #[prost(message, tag = "3")]
    LeaveRoom(WireRoom),
    #[prost(message, tag = "4")]
    Joined(WireJoined),
    #[prost(message, tag = "5")]
    PeerLeft(WirePeerLeft),
    #[prost(message, tag = "6")]
    Error(WireError),
}

#[derive(Clone, PartialEq, Message)]
struct WireRoom {
    #[prost(string, tag = "1")]
    room_id: String,
}

#[derive(Clone, PartialEq, Message)]
struct WireDraw {
    #[prost(string, tag = "1")]
    room_id: String,
    #[prost(string, tag = "2")]
    stroke_id: String,
    #[prost(string, optional, tag = "3")]
    from: Option<String>,
    #[prost(enumeration = "WireTool", tag = "4")]
    tool: i32,
    #[prost(string, tag = "5")]
    color: String,
    #[prost(double, tag = "6")]
    line_width: f64,
    #[prost(message, repeated, tag = "7")]
    points: Vec<WirePoint>,
}

#[derive(Clone, Copy, PartialEq, Message)]
struct WirePoint {
    #[prost(double, tag = "1")]
    x: f64,
    #[prost(double, tag = "2")]
    y: f64,
}

#[derive(Clone, PartialEq, Message)]
struct WireJoined {
    #[prost(string, tag = "1")]
    room_id: String,
    #[prost(uint32, tag = "2")]
    peers: u32,
}

#[derive(Clone, PartialEq, Message)]
struct WirePeerLeft {
    #[prost(string, tag = "1")]
    room_id: String,
    #[prost(string, tag = "2")]
    peer: String,
}

#[derive(Clone, PartialEq, Message)]
struct WireError {
    #[prost(string, tag = "1")]
    code: String,
    #[prost(string, tag = "2")]
    message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireTool {
    Brush = 0,
    Eraser = 1,
    Text = 2,
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
