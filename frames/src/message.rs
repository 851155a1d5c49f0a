//! Typed realtime channel messages.
//!
//! DESIGN
//! ======
//! The channel speaks a closed set of variants. Clients send `join-room`,
//! `draw`, and `leave-room`; the server answers with `joined`, relays `draw`
//! to peers, announces `peer-left`, and reports `error`. Payload shape is
//! checked by serde (or the protobuf codec), payload semantics by
//! [`ChannelMessage::validate`] before anything is relayed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stroke::{Point, Stroke, StrokeError, Tool};

/// Upper bound on points carried by one `draw` event.
pub const MAX_DRAW_POINTS: usize = 10_000;

/// Error returned by [`ChannelMessage::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MessageError {
    #[error("invalid stroke: {0}")]
    Stroke(#[from] StrokeError),
    #[error("draw event has {0} points (max {MAX_DRAW_POINTS})")]
    TooManyPoints(usize),
}

/// Incremental stroke broadcast. Carries the whole in-progress stroke so a
/// receiver can paint it without any prior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawEvent {
    pub room_id: Uuid,
    /// Sender-local identifier of the stroke being drawn. Lets receivers
    /// replace an earlier partial copy instead of stacking duplicates.
    pub stroke_id: Uuid,
    /// Originating client. Stamped by the server on relay; ignored inbound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Uuid>,
    pub tool: Tool,
    pub color: String,
    pub line_width: f64,
    pub points: Vec<Point>,
}

impl DrawEvent {
    /// Build a draw event from a stroke snapshot.
    #[must_use]
    pub fn from_stroke(room_id: Uuid, stroke_id: Uuid, stroke: &Stroke) -> Self {
        Self {
            room_id,
            stroke_id,
            from: None,
            tool: stroke.tool,
            color: stroke.color.clone(),
            line_width: stroke.line_width,
            points: stroke.points.clone(),
        }
    }

    /// The stroke this event describes.
    #[must_use]
    pub fn to_stroke(&self) -> Stroke {
        Stroke {
            tool: self.tool,
            color: self.color.clone(),
            line_width: self.line_width,
            points: self.points.clone(),
        }
    }

    #[must_use]
    pub fn with_from(mut self, from: Uuid) -> Self {
        self.from = Some(from);
        self
    }
}

/// Every message that can travel over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelMessage {
    /// Subscribe to a whiteboard's room.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: Uuid },
    /// Stroke broadcast, client to server and server to peers.
    Draw(DrawEvent),
    /// Unsubscribe from a room.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: Uuid },
    /// Join acknowledgement with the current member count.
    #[serde(rename_all = "camelCase")]
    Joined { room_id: Uuid, peers: u32 },
    /// A peer left the room or disconnected.
    #[serde(rename_all = "camelCase")]
    PeerLeft { room_id: Uuid, peer: Uuid },
    /// Request-level failure reported to the sender only.
    Error { code: String, message: String },
}

impl ChannelMessage {
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error { code: code.into(), message: message.into() }
    }

    /// Wire name of the variant, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::Draw(_) => "draw",
            Self::LeaveRoom { .. } => "leave-room",
            Self::Joined { .. } => "joined",
            Self::PeerLeft { .. } => "peer-left",
            Self::Error { .. } => "error",
        }
    }

    /// Check payload semantics that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] for a `draw` whose stroke is invalid or
    /// oversized. Other variants are always valid once decoded.
    pub fn validate(&self) -> Result<(), MessageError> {
        let Self::Draw(event) = self else {
            return Ok(());
        };
        if event.points.len() > MAX_DRAW_POINTS {
            return Err(MessageError::TooManyPoints(event.points.len()));
        }
        event.to_stroke().validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
