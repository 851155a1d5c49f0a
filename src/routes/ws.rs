//! WebSocket handler — realtime stroke relay.
//!
//! DESIGN
//! ======
//! On upgrade the connection gets a fresh client id and a bounded outbound
//! queue, then enters a `select!` loop:
//! - Incoming client messages → decode, validate, dispatch
//! - Messages queued by room peers → forward to the client
//!
//! Messages travel as protobuf binary frames. JSON text frames of the same
//! shape are accepted too, and the server answers in whichever encoding the
//! client used last.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade with `?token=` → resolve the user or reject with 401
//! 2. `join-room` → access check → `joined` reply
//! 3. `draw` → relayed to the other members of the joined room
//! 4. Close → leave the room, peers get `peer-left`

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use frames::{ChannelMessage, CodecError, MessageError, decode_message, encode_message};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::routes::ApiError;
use crate::routes::auth::resolve_token;
use crate::services::room;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// Encoding of the last inbound frame; replies mirror it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WireFormat {
    #[default]
    Binary,
    Json,
}

#[derive(Debug, thiserror::Error)]
enum InboundError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("malformed json message: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] MessageError),
    #[error("{0} messages are only sent by the server")]
    Unexpected(&'static str),
}

impl ErrorCode for InboundError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Codec(_) | Self::Json(_) => "E_MALFORMED_MESSAGE",
            Self::Invalid(e) => e.error_code(),
            Self::Unexpected(_) => "E_UNEXPECTED_MESSAGE",
        }
    }
}

/// Per-connection state.
struct Session {
    client_id: Uuid,
    user_id: Uuid,
    current_room: Option<Uuid>,
    tx: mpsc::Sender<ChannelMessage>,
}

impl Session {
    fn new(client_id: Uuid, user_id: Uuid, tx: mpsc::Sender<ChannelMessage>) -> Self {
        Self { client_id, user_id, current_room: None, tx }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.get("token") else {
        return ApiError::unauthorized().into_response();
    };
    let user = match resolve_token(&state, token).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, user.id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: Uuid) {
    let client_id = Uuid::new_v4();

    // Per-connection queue for messages relayed by room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ChannelMessage>(state.config.room_client_queue);
    let mut session = Session::new(client_id, user_id, client_tx);
    let mut format = WireFormat::default();

    info!(%client_id, %user_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => {
                        format = WireFormat::Binary;
                        process_inbound_bytes(&state, &mut session, &bytes).await
                    }
                    Message::Text(text) => {
                        format = WireFormat::Json;
                        process_inbound_text(&state, &mut session, text.as_str()).await
                    }
                    Message::Close(_) => break,
                    _ => continue,
                };
                if !send_all(&mut socket, format, &replies).await {
                    break;
                }
            }
            Some(message) = client_rx.recv() => {
                if !send_message(&mut socket, format, &message).await {
                    break;
                }
            }
        }
    }

    if let Some(room_id) = session.current_room.take() {
        room::leave_room(&state, room_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

async fn send_all(socket: &mut WebSocket, format: WireFormat, messages: &[ChannelMessage]) -> bool {
    for message in messages {
        if !send_message(socket, format, message).await {
            return false;
        }
    }
    true
}

/// Returns `false` once the socket is gone.
async fn send_message(socket: &mut WebSocket, format: WireFormat, message: &ChannelMessage) -> bool {
    let frame = match format {
        WireFormat::Binary => Message::Binary(encode_message(message).into()),
        WireFormat::Json => match serde_json::to_string(message) {
            Ok(json) => Message::Text(json.into()),
            Err(e) => {
                warn!(error = %e, kind = message.kind(), "ws: failed to serialize message");
                return true;
            }
        },
    };
    socket.send(frame).await.is_ok()
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and process one binary frame, returning replies for the sender.
async fn process_inbound_bytes(state: &AppState, session: &mut Session, bytes: &[u8]) -> Vec<ChannelMessage> {
    let decoded = decode_message(bytes).map_err(InboundError::from);
    process_inbound(state, session, decoded).await
}

/// Decode and process one JSON text frame, returning replies for the sender.
async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> Vec<ChannelMessage> {
    let decoded = serde_json::from_str::<ChannelMessage>(text).map_err(InboundError::from);
    process_inbound(state, session, decoded).await
}

fn error_reply(session: &Session, err: &impl ErrorCode) -> Vec<ChannelMessage> {
    warn!(client_id = %session.client_id, code = err.error_code(), error = %err, "ws: rejected inbound message");
    vec![ChannelMessage::error(err.error_code(), err.to_string())]
}

/// Validate and dispatch one decoded message. Transport concerns stay in
/// [`run_ws`] so tests can drive this directly.
async fn process_inbound(
    state: &AppState,
    session: &mut Session,
    decoded: Result<ChannelMessage, InboundError>,
) -> Vec<ChannelMessage> {
    let message = match decoded.and_then(|m| m.validate().map(|()| m).map_err(InboundError::from)) {
        Ok(message) => message,
        Err(e) => return error_reply(session, &e),
    };

    match message {
        ChannelMessage::JoinRoom { room_id } => join(state, session, room_id).await,
        ChannelMessage::LeaveRoom { room_id } => {
            if session.current_room == Some(room_id) {
                session.current_room = None;
                room::leave_room(state, room_id, session.client_id).await;
            }
            Vec::new()
        }
        ChannelMessage::Draw(event) => {
            if session.current_room != Some(event.room_id) {
                return error_reply(session, &room::RoomError::NotJoined(event.room_id));
            }
            match room::broadcast_stroke(state, session.client_id, event).await {
                Ok(_) => Vec::new(),
                Err(e) => error_reply(session, &e),
            }
        }
        other @ (ChannelMessage::Joined { .. } | ChannelMessage::PeerLeft { .. } | ChannelMessage::Error { .. }) => {
            error_reply(session, &InboundError::Unexpected(other.kind()))
        }
    }
}

/// Join `room_id`, leaving the previous room only once the new join succeeded.
async fn join(state: &AppState, session: &mut Session, room_id: Uuid) -> Vec<ChannelMessage> {
    let peers = match room::join_room(state, room_id, session.client_id, session.user_id, session.tx.clone()).await {
        Ok(peers) => peers,
        Err(e) => return error_reply(session, &e),
    };
    if let Some(previous) = session.current_room.replace(room_id) {
        if previous != room_id {
            room::leave_room(state, previous, session.client_id).await;
        }
    }
    vec![ChannelMessage::Joined { room_id, peers }]
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
