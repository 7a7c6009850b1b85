//! Codec module - serialization for argument, result and envelope payloads.
//!
//! [`MsgPackCodec`] wraps `rmp-serde`. Structs are encoded as maps so that
//! peers written against field names keep working when fields are reordered.
//!
//! # Example
//!
//! ```
//! use wirecall::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::{MsgPackCodec, MSGPACK_NIL};
