//! Client, server and transport settings.
//!
//! All settings have defaults and can be loaded from JSON, e.g.
//!
//! ```
//! use wirecall::config::ClientConfig;
//!
//! let config = ClientConfig::from_json_str(
//!     r#"{ "transport": { "block_size": 4096 }, "request_timeout_ms": 2500 }"#,
//! )
//! .unwrap();
//! assert_eq!(config.transport.block_size, 4096);
//! assert_eq!(config.request_timeout.unwrap().as_millis(), 2500);
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default scratch buffer size for transport reads (64 KB).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Settings shared by every transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest payload a header may announce.
    pub max_payload_size: u64,
    /// Preferred read size; also the capacity of the stream read buffer.
    pub block_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Settings for [`RpcClient`](crate::RpcClient).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Transport limits applied to responses.
    pub transport: TransportConfig,
    /// Upper bound for one request/response exchange. `None` waits forever.
    #[serde(rename = "request_timeout_ms", deserialize_with = "millis")]
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Parse from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Settings for [`Server`](crate::Server).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport limits applied to requests.
    pub transport: TransportConfig,
}

impl ServerConfig {
    /// Parse from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}
