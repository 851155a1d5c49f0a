//! Shared stroke model, realtime channel messages, and protobuf codec.
//!
//! This crate owns the data that crosses process boundaries: the [`Stroke`]
//! unit persisted in whiteboard documents, and the [`ChannelMessage`] set
//! exchanged over the realtime websocket. Both the `canvas` engine and the
//! server depend on it so the two sides agree on shape and validation.
//!
//! | Module | Role |
//! |--------|------|
//! | [`stroke`] | `Stroke`, `Point`, `Tool`, color parsing and validation |
//! | [`message`] | Closed set of channel messages and their semantic checks |
//! | [`codec`] | Binary protobuf encoding of channel messages |

pub mod codec;
pub mod message;
pub mod stroke;

pub use codec::{CodecError, decode_message, encode_message};
pub use message::{ChannelMessage, DrawEvent, MAX_DRAW_POINTS, MessageError};
pub use stroke::{Point, Rgb, Stroke, StrokeError, Tool};
