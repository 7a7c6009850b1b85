//! Request/response envelope carried inside one frame.
//!
//! A request populates `operation` and `arguments`; a response carries the
//! operation name through and populates `result`. The whole envelope is
//! MsgPack-encoded and becomes the frame payload.
//!
//! # Example
//!
//! ```
//! use wirecall::protocol::Envelope;
//!
//! let request = Envelope::for_request("Foo", vec![Some(vec![1]), None]);
//! let bytes = request.encode().unwrap();
//! let decoded = Envelope::decode(&bytes).unwrap();
//! assert_eq!(decoded, request);
//! ```

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::codec::MsgPackCodec;
use crate::error::{Result, RpcError};

/// One nullable argument or result blob.
pub type Blob = Option<ByteBuf>;

/// Logical request or response message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Remote operation name.
    pub operation: String,
    /// One blob per declared parameter, in order.
    #[serde(default)]
    pub arguments: Vec<Blob>,
    /// Encoded return value, responses only.
    #[serde(default)]
    pub result: Blob,
}

impl Envelope {
    /// Build a request envelope.
    pub fn for_request(operation: impl Into<String>, arguments: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            operation: operation.into(),
            arguments: arguments.into_iter().map(|a| a.map(ByteBuf::from)).collect(),
            result: None,
        }
    }

    /// Build a response envelope. `None` means the operation returns nothing.
    pub fn for_response(operation: impl Into<String>, result: Option<Vec<u8>>) -> Self {
        Self {
            operation: operation.into(),
            arguments: Vec::new(),
            result: result.map(ByteBuf::from),
        }
    }

    /// Result bytes, or `None` when absent or empty.
    pub fn result_bytes(&self) -> Option<&[u8]> {
        self.result
            .as_deref()
            .map(|b| b.as_slice())
            .filter(|b| !b.is_empty())
    }

    /// Serialize into a frame payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }

    /// Parse a frame payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(RpcError::MalformedEnvelope)
    }
}

/// Something read off a transport: an envelope or the end-of-session signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A decoded envelope.
    Envelope(Envelope),
    /// The peer closed the session; no further requests follow.
    SessionEnded,
}

impl Inbound {
    /// True for the session-end signal.
    #[inline]
    pub fn is_session_ended(&self) -> bool {
        matches!(self, Inbound::SessionEnded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip_keeps_null_argument() {
        let request = Envelope::for_request("Foo", vec![Some(vec![0x01]), None]);
        let decoded = Envelope::decode(&request.encode().unwrap()).unwrap();

        assert_eq!(decoded.operation, "Foo");
        assert_eq!(decoded.arguments.len(), 2);
        assert_eq!(decoded.arguments[0].as_deref().map(|b| b.as_slice()), Some(&[0x01][..]));
        assert!(decoded.arguments[1].is_none());
        assert!(decoded.result.is_none());
    }

    #[test]
    fn test_zero_argument_request() {
        let request = Envelope::for_request("Ping", Vec::new());
        let decoded = Envelope::decode(&request.encode().unwrap()).unwrap();
        assert!(decoded.arguments.is_empty());
    }

    #[test]
    fn test_response_result_bytes() {
        let response = Envelope::for_response("Add", Some(vec![7]));
        assert_eq!(response.result_bytes(), Some(&[7][..]));

        let empty = Envelope::for_response("Log", None);
        assert_eq!(empty.result_bytes(), None);

        let blank = Envelope::for_response("Log", Some(Vec::new()));
        assert_eq!(blank.result_bytes(), None);
    }

    #[test]
    fn test_blobs_encode_as_msgpack_bin() {
        let request = Envelope::for_request("F", vec![Some(vec![1, 2, 3])]);
        let bytes = request.encode().unwrap();
        // bin8 marker followed by length 3
        assert!(bytes.windows(2).any(|w| w == [0xc4, 0x03]));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result = Envelope::decode(b"not an envelope");
        assert!(matches!(result, Err(RpcError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_session_ended_is_tagged() {
        assert!(Inbound::SessionEnded.is_session_ended());
        // An empty envelope is not the sentinel.
        assert!(!Inbound::Envelope(Envelope::default()).is_session_ended());
    }
}
