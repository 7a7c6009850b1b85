//! # wirecall
//!
//! Minimal request/response RPC over any byte stream.
//!
//! A server exposes a named contract of typed operations backed by a worker
//! object; a client calls those operations by name over a connected
//! transport. Requests are handled one at a time per connection.
//!
//! ## Layers
//!
//! - **Frame**: 14-byte header (fixed marker bytes plus a little-endian
//!   `u64` length) followed by the payload. An all-zero header with nothing
//!   behind it ends the session.
//! - **Envelope**: MsgPack map of operation name, argument blobs and result
//!   blob. Blobs may be nil.
//! - **Transport**: buffered stream ([`transport::StreamTransport`]) or raw
//!   TCP socket ([`transport::SocketTransport`]).
//! - **Contract**: typed operation registry with arity checks and uniform
//!   handling of immediate and deferred results.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wirecall::contract::{ContractInfo, Method, Reply, ServiceContract};
//! use wirecall::transport::SocketTransport;
//! use wirecall::{CancelSignal, RpcClient, Server};
//!
//! const ADD: Method<(i32, i32), i32> = Method::new("Add");
//!
//! struct Calculator;
//!
//! #[tokio::main]
//! async fn main() -> wirecall::Result<()> {
//!     let contract = ServiceContract::builder("Calculator")
//!         .operation(&ADD, |_calc: Arc<Calculator>, (a, b)| Reply::ready(a + b))
//!         .build();
//!     let server = Server::new(contract, Calculator);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
//!     let addr = listener.local_addr()?;
//!     tokio::spawn(async move { server.serve_tcp(listener, CancelSignal::new()).await });
//!
//!     let client = RpcClient::new(ContractInfo::new("Calculator").with_method(&ADD));
//!     let mut transport = SocketTransport::connect(addr, client.transport_config()).await?;
//!     assert_eq!(client.call(&mut transport, &ADD, (3, 4)).await?, 7);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod codec;
pub mod config;
pub mod contract;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

mod client;

pub use cancel::CancelSignal;
pub use client::{ClientBuilder, RpcClient};
pub use config::{ClientConfig, ServerConfig, TransportConfig};
pub use error::{OperationError, Result, RpcError};
pub use server::{ConnectionHandle, Hooks, Server, ServerBuilder};
