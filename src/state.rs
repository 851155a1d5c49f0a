//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the document store behind a trait object, the live realtime rooms,
//! and the sender half of the shared-element cascade queue. Rooms exist only
//! while at least one client is joined; nothing about them is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use frames::ChannelMessage;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::store::DocumentStore;

// =============================================================================
// ROOM STATE
// =============================================================================

/// One websocket connection joined to a room.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub user_id: Uuid,
    /// Owner or collaborator. Public viewers may watch but not draw.
    pub can_edit: bool,
    pub tx: mpsc::Sender<ChannelMessage>,
}

/// Live members of one whiteboard's room, keyed by client id.
#[derive(Debug, Default)]
pub struct RoomState {
    pub clients: HashMap<Uuid, ConnectedClient>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub rooms: Arc<RwLock<HashMap<Uuid, RoomState>>>,
    /// Cascade queue. `None` until the worker is spawned; saves then skip
    /// the resync.
    pub cascade_tx: Option<mpsc::Sender<Uuid>>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self { store, rooms: Arc::new(RwLock::new(HashMap::new())), cascade_tx: None, config: Arc::new(config) }
    }

    #[must_use]
    pub fn with_cascade(mut self, tx: mpsc::Sender<Uuid>) -> Self {
        self.cascade_tx = Some(tx);
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
