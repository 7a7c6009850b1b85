//! MsgPack codec using `rmp-serde`.
//!
//! Always `to_vec_named`: structs travel as maps keyed by field name rather
//! than as positional arrays.
//!
//! # Example
//!
//! ```
//! use wirecall::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let p = Point { x: 3, y: 4 };
//! let encoded = MsgPackCodec::encode(&p).unwrap();
//! let decoded: Point = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, p);
//! ```

use crate::error::Result;

/// Encoding of `nil`, which decodes into `()` and `Option::None`.
pub const MSGPACK_NIL: [u8; 1] = [0xc0];

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value; structs become maps keyed by field name.
    ///
    /// # Errors
    ///
    /// [`RpcError::Encode`](crate::RpcError::Encode) when the value's
    /// `Serialize` impl reports an error, or when it emits a sequence or map
    /// without a known length.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode a result or argument blob.
    ///
    /// # Errors
    ///
    /// [`RpcError::Decode`](crate::RpcError::Decode) when the bytes are
    /// truncated, are not MsgPack, or hold a value of another shape than `T`.
    /// Nil ([`MSGPACK_NIL`]) only decodes into `()` and `Option`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
