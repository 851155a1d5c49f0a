//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own access control and business rules so route handlers
//! stay focused on protocol translation and auth plumbing. Persistence goes
//! through [`crate::store::DocumentStore`]; services never see SQL.

pub mod cascade;
pub mod room;
pub mod shared_element;
pub mod whiteboard;
