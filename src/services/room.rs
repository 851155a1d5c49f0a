//! Realtime rooms: one per whiteboard, relaying in-progress strokes between
//! the clients drawing on it.
//!
//! DESIGN
//! ======
//! Membership lives only in memory (`AppState::rooms`). A room is created by
//! its first join and removed when its last member leaves. Relay is
//! fire-and-forget: each member has a bounded outbound queue and delivery is
//! a `try_send`, so a slow client loses events instead of stalling the room.
//! Nothing is acknowledged or retried; a client that fell behind recovers by
//! reloading the persisted document.
//!
//! The sender of a stroke never receives its own event back.

use frames::{ChannelMessage, DrawEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::services::whiteboard::{self, WhiteboardError};
use crate::state::{AppState, ConnectedClient, RoomState};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("not joined to room {0}")]
    NotJoined(Uuid),
    #[error("read-only access to room {0}")]
    ReadOnly(Uuid),
    #[error(transparent)]
    Whiteboard(#[from] WhiteboardError),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotJoined(_) => "E_NOT_IN_ROOM",
            Self::ReadOnly(_) => "E_READ_ONLY",
            Self::Whiteboard(e) => e.error_code(),
        }
    }
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Add a client to a whiteboard's room. Re-joining is a no-op apart from
/// replacing the sender. Returns the member count after the join.
///
/// # Errors
///
/// `NotFound`/`AccessDenied` (wrapped) unless the user may load the board.
pub async fn join_room(
    state: &AppState,
    room_id: Uuid,
    client_id: Uuid,
    user_id: Uuid,
    tx: mpsc::Sender<ChannelMessage>,
) -> Result<u32, RoomError> {
    let wb = whiteboard::load_whiteboard(state.store.as_ref(), room_id, user_id).await?;
    let can_edit = wb.can_edit(user_id);

    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_id).or_insert_with(RoomState::new);
    room.clients.insert(client_id, ConnectedClient { user_id, can_edit, tx });
    let peers = u32::try_from(room.clients.len()).unwrap_or(u32::MAX);

    info!(%room_id, %client_id, %user_id, peers, can_edit, "client joined room");
    Ok(peers)
}

/// Remove a client from a room and tell the remaining members. Removes the
/// room once empty. Returns `false` if the client was not a member.
pub async fn leave_room(state: &AppState, room_id: Uuid, client_id: Uuid) -> bool {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&room_id) else {
        return false;
    };
    let Some(client) = room.clients.remove(&client_id) else {
        return false;
    };
    info!(%room_id, %client_id, user_id = %client.user_id, remaining = room.clients.len(), "client left room");

    if room.clients.is_empty() {
        rooms.remove(&room_id);
        info!(%room_id, "removed empty room");
    } else {
        let notice = ChannelMessage::PeerLeft { room_id, peer: client_id };
        relay(room, room_id, &notice, None);
    }
    true
}

// =============================================================================
// BROADCAST
// =============================================================================

fn relay(room: &RoomState, room_id: Uuid, message: &ChannelMessage, exclude: Option<Uuid>) -> usize {
    let mut delivered = 0;
    for (client_id, client) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        match client.tx.try_send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                debug!(%room_id, %client_id, kind = message.kind(), "client queue full; dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%room_id, %client_id, kind = message.kind(), "client queue closed; dropping event");
            }
        }
    }
    delivered
}

/// Relay a validated stroke to every other member of its room, stamped with
/// the sender's client id.
///
/// # Errors
///
/// `NotJoined` if the sender is not a member of `event.room_id`, `ReadOnly`
/// if it joined a public board without edit access.
pub async fn broadcast_stroke(state: &AppState, client_id: Uuid, event: DrawEvent) -> Result<usize, RoomError> {
    let room_id = event.room_id;
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&room_id) else {
        return Err(RoomError::NotJoined(room_id));
    };
    match room.clients.get(&client_id) {
        None => return Err(RoomError::NotJoined(room_id)),
        Some(sender) if !sender.can_edit => return Err(RoomError::ReadOnly(room_id)),
        Some(_) => {}
    }
    let message = ChannelMessage::Draw(event.with_from(client_id));
    Ok(relay(room, room_id, &message, Some(client_id)))
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
