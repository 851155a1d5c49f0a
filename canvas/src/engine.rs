//! Drawing engine: ties pointer input, stroke history, the remote overlay,
//! and the realtime link together.
//!
//! DESIGN
//! ======
//! [`EngineCore`] holds all state that does not depend on the browser so it
//! can be tested natively. Input handlers return [`Action`]s for the host to
//! carry out (repaint, send a channel message, persist, reload). [`Engine`]
//! wraps the core together with a [`WebSurface`].
//!
//! Local strokes live in the [`StrokeStore`]. Strokes received from peers go
//! into a separate overlay keyed by `(sender, stroke id)` so a growing remote
//! stroke replaces its earlier partial copy. The overlay is painted after the
//! local active prefix and never enters the local undo history.
//!
//! Each move re-sends the whole in-progress stroke so a receiver can replace
//! its copy without ordering guarantees. Once a stroke grows past
//! [`MAX_DRAW_POINTS`] it stops streaming; it still reaches peers through the
//! saved document.
//!
//! ERROR HANDLING
//! ==============
//! The live channel is best effort. Malformed inbound frames and draws for
//! other rooms are ignored. A dropped transport, a refused join, or the
//! server reporting that this client is not in its room flips the link to
//! [`LinkState::Desynced`] and asks the host to reload the persisted document;
//! [`EngineCore::load_document`] is the recovery path and rejoins the room.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use frames::{ChannelMessage, DrawEvent, MAX_DRAW_POINTS, Point, Rgb, Stroke, Tool, decode_message};
use uuid::Uuid;
use wasm_bindgen::JsValue;
use web_sys::HtmlCanvasElement;

use crate::history::StrokeStore;
use crate::render::{self, Surface};
use crate::web::WebSurface;

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_LINE_WIDTH: f64 = 5.0;

/// Server error codes after which the live view is no longer trustworthy.
const DESYNC_CODES: &[&str] = &["E_ACCESS_DENIED", "E_NOT_IN_ROOM"];

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    /// Send this message over the realtime channel.
    Send(ChannelMessage),
    /// Persist this snapshot of the active prefix.
    Save(Vec<Stroke>),
    /// The live view can no longer be trusted; fetch the document again.
    ReloadRequired,
}

/// Health of the realtime link as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Live,
    Desynced,
}

/// A peer's in-flight or finished stroke, visual only.
#[derive(Debug, Clone, PartialEq)]
struct RemoteStroke {
    from: Uuid,
    stroke_id: Uuid,
    stroke: Stroke,
}

/// Core engine state. Everything that doesn't depend on the canvas element.
#[derive(Debug, Clone)]
pub struct EngineCore {
    pub history: StrokeStore,
    pub tool: Tool,
    pub color: String,
    pub line_width: f64,
    room: Option<Uuid>,
    /// Id of the local stroke being drawn, shared by its draw broadcasts.
    drawing_id: Option<Uuid>,
    remote: Vec<RemoteStroke>,
    link: LinkState,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self {
            history: StrokeStore::new(),
            tool: Tool::Brush,
            color: DEFAULT_COLOR.to_owned(),
            line_width: DEFAULT_LINE_WIDTH,
            room: None,
            drawing_id: None,
            remote: Vec::new(),
            link: LinkState::Live,
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Room ---

    /// Enter the room for `whiteboard_id`. The server parts the previous
    /// room only once the new join succeeds, so no `leave-room` is sent.
    /// Peer strokes from the old room are dropped.
    pub fn join_room(&mut self, whiteboard_id: Uuid) -> Vec<Action> {
        if self.room == Some(whiteboard_id) {
            return Vec::new();
        }
        self.room = Some(whiteboard_id);
        let mut actions = vec![Action::Send(ChannelMessage::JoinRoom { room_id: whiteboard_id })];
        if !self.remote.is_empty() {
            self.remote.clear();
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Leave the current room, if any.
    pub fn leave_room(&mut self) -> Vec<Action> {
        let Some(room_id) = self.room.take() else {
            return Vec::new();
        };
        let mut actions = vec![Action::Send(ChannelMessage::LeaveRoom { room_id })];
        if !self.remote.is_empty() {
            self.remote.clear();
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    #[must_use]
    pub fn room(&self) -> Option<Uuid> {
        self.room
    }

    // --- Pen settings ---

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Set the pen color from `#RGB` or `#RRGGBB`, stored as `#RRGGBB`.
    /// Anything else (CSS names included) is ignored, since the server
    /// rejects strokes it cannot parse.
    pub fn set_color(&mut self, color: &str) {
        if let Ok(rgb) = Rgb::parse(color) {
            self.color = rgb.to_string();
        }
    }

    pub fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.line_width = width;
        }
    }

    // --- Pointer input ---

    /// Start a stroke at `point`. Drops any redoable history.
    pub fn on_pointer_down(&mut self, point: Point) -> Vec<Action> {
        if !point.is_finite() {
            return Vec::new();
        }
        self.history.begin_stroke(self.tool, self.color.clone(), self.line_width, point);
        self.drawing_id = Some(Uuid::new_v4());
        vec![Action::RenderNeeded]
    }

    /// Extend the current stroke and broadcast it to the room.
    pub fn on_pointer_move(&mut self, point: Point) -> Vec<Action> {
        if !point.is_finite() || !self.history.extend_stroke(point) {
            return Vec::new();
        }
        let mut actions = vec![Action::RenderNeeded];
        if let Some(message) = self.draw_message() {
            actions.push(Action::Send(message));
        }
        actions
    }

    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        self.history.end_stroke();
        self.drawing_id = None;
        Vec::new()
    }

    // --- History ---

    pub fn undo(&mut self) -> Vec<Action> {
        self.drawing_id = None;
        self.history_changed(StrokeStore::undo)
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.history_changed(StrokeStore::redo)
    }

    pub fn clear(&mut self) -> Vec<Action> {
        self.drawing_id = None;
        self.history_changed(StrokeStore::clear)
    }

    /// Snapshot the active prefix for persistence.
    #[must_use]
    pub fn save(&self) -> Action {
        Action::Save(self.history.active_prefix().to_vec())
    }

    // --- Remote input ---

    /// Apply one message received over the realtime channel.
    pub fn apply_remote(&mut self, message: &ChannelMessage) -> Vec<Action> {
        match message {
            ChannelMessage::Draw(event) if Some(event.room_id) == self.room => self.apply_remote_draw(event),
            ChannelMessage::Error { code, .. } if DESYNC_CODES.contains(&code.as_str()) => self.on_channel_rejected(code),
            _ => Vec::new(),
        }
    }

    /// The server refused a join or no longer counts this client as a room
    /// member. A refused join leaves no room to broadcast into.
    fn on_channel_rejected(&mut self, code: &str) -> Vec<Action> {
        if code == "E_ACCESS_DENIED" {
            self.room = None;
            self.remote.clear();
        }
        self.link = LinkState::Desynced;
        vec![Action::ReloadRequired]
    }

    /// Decode a binary frame and apply it. Undecodable frames are ignored.
    pub fn apply_frame(&mut self, bytes: &[u8]) -> Vec<Action> {
        match decode_message(bytes) {
            Ok(message) => self.apply_remote(&message),
            Err(_) => Vec::new(),
        }
    }

    /// The transport closed or failed; live state may be missing strokes.
    pub fn on_transport_dropped(&mut self) -> Vec<Action> {
        self.link = LinkState::Desynced;
        vec![Action::ReloadRequired]
    }

    /// Replace local history with the persisted document, drop the overlay,
    /// and rejoin the current room. This is how a desynced client recovers.
    pub fn load_document(&mut self, strokes: Vec<Stroke>) -> Vec<Action> {
        self.history.load(strokes);
        self.remote.clear();
        self.drawing_id = None;
        let mut actions = vec![Action::RenderNeeded];
        if self.link == LinkState::Desynced {
            if let Some(room_id) = self.room {
                actions.push(Action::Send(ChannelMessage::JoinRoom { room_id }));
            }
        }
        self.link = LinkState::Live;
        actions
    }

    // --- Queries ---

    #[must_use]
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Number of peer strokes currently shown.
    #[must_use]
    pub fn remote_len(&self) -> usize {
        self.remote.len()
    }

    /// Everything to paint, bottom first: local active prefix then overlay.
    pub fn scene(&self) -> impl Iterator<Item = &Stroke> {
        self.history
            .active_prefix()
            .iter()
            .chain(self.remote.iter().map(|r| &r.stroke))
    }

    /// Repaint the full scene on `surface`.
    ///
    /// # Errors
    ///
    /// Propagates the surface's error.
    pub fn paint<S: Surface>(&self, surface: &mut S) -> Result<(), S::Error> {
        render::render(surface, self.scene())
    }

    // --- Helpers ---

    fn history_changed(&mut self, op: impl FnOnce(&mut StrokeStore)) -> Vec<Action> {
        let before = (self.history.cursor(), self.history.len());
        op(&mut self.history);
        if (self.history.cursor(), self.history.len()) == before {
            Vec::new()
        } else {
            vec![Action::RenderNeeded]
        }
    }

    fn draw_message(&self) -> Option<ChannelMessage> {
        let room_id = self.room?;
        let stroke_id = self.drawing_id?;
        let stroke = self.history.current()?;
        if stroke.points.len() > MAX_DRAW_POINTS {
            return None;
        }
        Some(ChannelMessage::Draw(DrawEvent::from_stroke(room_id, stroke_id, stroke)))
    }

    fn apply_remote_draw(&mut self, event: &DrawEvent) -> Vec<Action> {
        let stroke = event.to_stroke();
        if stroke.validate().is_err() {
            return Vec::new();
        }
        let from = event.from.unwrap_or_else(Uuid::nil);
        match self
            .remote
            .iter_mut()
            .find(|r| r.from == from && r.stroke_id == event.stroke_id)
        {
            Some(existing) => existing.stroke = stroke,
            None => self.remote.push(RemoteStroke { from, stroke_id: event.stroke_id, stroke }),
        }
        vec![Action::RenderNeeded]
    }
}

/// The full canvas engine. Wraps [`EngineCore`] and owns the browser surface.
pub struct Engine {
    surface: WebSurface,
    pub core: EngineCore,
}

impl Engine {
    /// Create an engine bound to `canvas`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        Ok(Self { surface: WebSurface::new(canvas)?, core: EngineCore::new() })
    }

    /// Draw the current scene to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a `Canvas2D` call fails.
    pub fn render(&mut self) -> Result<(), JsValue> {
        self.core.paint(&mut self.surface)
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        self.surface.canvas()
    }

    // --- Delegated inputs ---

    pub fn join_room(&mut self, whiteboard_id: Uuid) -> Vec<Action> {
        self.core.join_room(whiteboard_id)
    }

    pub fn leave_room(&mut self) -> Vec<Action> {
        self.core.leave_room()
    }

    pub fn on_pointer_down(&mut self, point: Point) -> Vec<Action> {
        self.core.on_pointer_down(point)
    }

    pub fn on_pointer_move(&mut self, point: Point) -> Vec<Action> {
        self.core.on_pointer_move(point)
    }

    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        self.core.on_pointer_up()
    }

    pub fn undo(&mut self) -> Vec<Action> {
        self.core.undo()
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.core.redo()
    }

    pub fn clear(&mut self) -> Vec<Action> {
        self.core.clear()
    }

    #[must_use]
    pub fn save(&self) -> Action {
        self.core.save()
    }

    pub fn apply_frame(&mut self, bytes: &[u8]) -> Vec<Action> {
        self.core.apply_frame(bytes)
    }

    pub fn on_transport_dropped(&mut self) -> Vec<Action> {
        self.core.on_transport_dropped()
    }

    pub fn load_document(&mut self, strokes: Vec<Stroke>) -> Vec<Action> {
        self.core.load_document(strokes)
    }
}
