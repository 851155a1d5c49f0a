//! Client drawing engine for the collaborative whiteboard.
//!
//! Compiled to WebAssembly for the browser and natively for tests. It owns
//! the local stroke history, repaints the canvas from that history, and turns
//! pointer input into realtime channel messages. The host JavaScript layer
//! wires DOM events in, carries out the returned [`engine::Action`]s, and
//! moves bytes over the websocket.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`history`] | Stroke history with an undo/redo cursor |
//! | [`render`] | Full-repaint renderer and the [`render::Surface`] trait |
//! | [`raster`] | Deterministic software surface |
//! | [`web`] | `CanvasRenderingContext2d` surface |
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |

pub mod engine;
pub mod history;
pub mod raster;
pub mod render;
pub mod web;
