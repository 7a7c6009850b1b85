//! Protocol module - wire format, envelope, and frame I/O.
//!
//! This module implements the framed request/response protocol:
//! - 14-byte header encoding/decoding and the session-end sentinel
//! - Envelope (operation name, argument blobs, result blob)
//! - Frame send/receive over any [`Transport`](crate::transport::Transport)

mod envelope;
mod frame;
mod wire_format;

pub use envelope::{Blob, Envelope, Inbound};
pub use frame::{build_frame, receive_frame, send_frame, send_session_end};
pub use wire_format::{
    decode_header, encode_header, validate_length, HeaderKind, DEFAULT_MAX_PAYLOAD_SIZE,
    HEADER_SIZE, MARKER,
};
