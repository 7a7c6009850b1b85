//! Wire format encoding and decoding.
//!
//! Implements the 14-byte header format:
//! ```text
//! ┌──────┬──────┬──────┬────────────────┬──────┬──────┬──────┐
//! │ 0xFF │ 0x00 │ 0xFF │ Payload length │ 0x00 │ 0xFF │ 0x00 │
//! │ 1    │ 1    │ 1    │ 8 bytes        │ 1    │ 1    │ 1    │
//! │      │      │      │ uint64 LE      │      │      │      │
//! └──────┴──────┴──────┴────────────────┴──────┴──────┴──────┘
//! ```
//!
//! An all-zero header with nothing buffered behind it is the session-end
//! sentinel. Any other header failing the fixed-byte check is a protocol error.

use crate::error::{Result, RpcError};

/// Header size in bytes (fixed, exactly 14).
pub const HEADER_SIZE: usize = 14;

/// Default maximum payload size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 1_073_741_824;

/// Marker byte value at offsets 0, 2 and 12.
pub const MARKER: u8 = 0xFF;

/// Offsets holding [`MARKER`].
const MARKER_OFFSETS: [usize; 3] = [0, 2, 12];

/// Offsets holding zero.
const ZERO_OFFSETS: [usize; 3] = [1, 11, 13];

/// Offset of the little-endian payload length.
const LENGTH_OFFSET: usize = 3;

/// Outcome of decoding a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// A frame follows with this many payload bytes.
    Frame(u64),
    /// The peer has no more requests.
    SessionEnded,
}

/// Encode a header announcing `payload_length` bytes.
///
/// # Example
///
/// ```
/// use wirecall::protocol::{encode_header, HEADER_SIZE};
///
/// let bytes = encode_header(5);
/// assert_eq!(bytes.len(), HEADER_SIZE);
/// assert_eq!(&bytes[..3], &[0xFF, 0x00, 0xFF]);
/// assert_eq!(bytes[3], 5);
/// ```
pub fn encode_header(payload_length: u64) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    for offset in MARKER_OFFSETS {
        buf[offset] = MARKER;
    }
    buf[LENGTH_OFFSET..LENGTH_OFFSET + 8].copy_from_slice(&payload_length.to_le_bytes());
    buf
}

/// Decode a header.
///
/// `more_available` reports whether the transport already holds bytes past
/// this header. An all-zero header is the session-end sentinel only when it
/// is `false`; a zero header followed by data is ambiguous and rejected.
///
/// # Example
///
/// ```
/// use wirecall::protocol::{decode_header, encode_header, HeaderKind};
///
/// let header = encode_header(42);
/// assert_eq!(decode_header(&header, false).unwrap(), HeaderKind::Frame(42));
/// assert_eq!(decode_header(&[0u8; 14], false).unwrap(), HeaderKind::SessionEnded);
/// assert!(decode_header(&[0u8; 14], true).is_err());
/// ```
pub fn decode_header(buf: &[u8; HEADER_SIZE], more_available: bool) -> Result<HeaderKind> {
    if has_fixed_bytes(buf) {
        let mut length = [0u8; 8];
        length.copy_from_slice(&buf[LENGTH_OFFSET..LENGTH_OFFSET + 8]);
        return Ok(HeaderKind::Frame(u64::from_le_bytes(length)));
    }

    if !more_available && buf.iter().all(|&b| b == 0) {
        return Ok(HeaderKind::SessionEnded);
    }

    Err(RpcError::InvalidHeader(*buf))
}

/// Reject a declared length above `max_payload_size`.
pub fn validate_length(length: u64, max_payload_size: u64) -> Result<()> {
    if length > max_payload_size {
        return Err(RpcError::PayloadTooLarge {
            length,
            max: max_payload_size,
        });
    }
    Ok(())
}

#[inline]
fn has_fixed_bytes(buf: &[u8; HEADER_SIZE]) -> bool {
    MARKER_OFFSETS.iter().all(|&i| buf[i] == MARKER) && ZERO_OFFSETS.iter().all(|&i| buf[i] == 0)
}
