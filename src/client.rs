//! Client request issuer.
//!
//! An [`RpcClient`] knows the contract it talks to (names and arities) and
//! issues one request/response exchange per call over a transport the caller
//! owns. The protocol has no request ids, so calls on one transport must not
//! overlap; `&mut` access to the transport enforces that.
//!
//! # Example
//!
//! ```ignore
//! use wirecall::contract::{ContractInfo, Method};
//! use wirecall::transport::SocketTransport;
//! use wirecall::RpcClient;
//!
//! const ADD: Method<(i32, i32), i32> = Method::new("Add");
//!
//! let client = RpcClient::builder(ContractInfo::new("Calculator").with_method(&ADD))
//!     .request_timeout(std::time::Duration::from_secs(5))
//!     .build();
//!
//! let mut transport = SocketTransport::connect("127.0.0.1:7000", client.transport_config()).await?;
//! let sum = client.call(&mut transport, &ADD, (3, 4)).await?;
//! assert_eq!(sum, 7);
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::cancel::CancelSignal;
use crate::codec::{MsgPackCodec, MSGPACK_NIL};
use crate::config::{ClientConfig, TransportConfig};
use crate::contract::{Arguments, ContractInfo, Method};
use crate::error::{Result, RpcError};
use crate::protocol::{receive_frame, send_frame, send_session_end, Envelope, Inbound};
use crate::transport::Transport;

/// Builder for configuring an [`RpcClient`].
pub struct ClientBuilder {
    info: ContractInfo,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a builder for the described contract.
    pub fn new(info: ContractInfo) -> Self {
        Self {
            info,
            config: ClientConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound each exchange. Default: no timeout.
    ///
    /// A call that times out may have sent its request or read part of the
    /// response, so the transport is out of step with the peer. Discard it
    /// after a [`RpcError::Timeout`].
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Largest response payload accepted.
    ///
    /// Default: 1 GB
    pub fn max_payload_size(mut self, max: u64) -> Self {
        self.config.transport.max_payload_size = max;
        self
    }

    /// Read size used by transports built from [`RpcClient::transport_config`].
    ///
    /// Default: 64 KB
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.transport.block_size = block_size;
        self
    }

    /// Build the client.
    pub fn build(self) -> RpcClient {
        RpcClient {
            info: Arc::new(self.info),
            config: self.config,
            cancel: CancelSignal::new(),
        }
    }
}

/// Issues typed and named calls against one contract.
#[derive(Clone)]
pub struct RpcClient {
    info: Arc<ContractInfo>,
    config: ClientConfig,
    cancel: CancelSignal,
}

impl RpcClient {
    /// Client with default configuration.
    pub fn new(info: ContractInfo) -> Self {
        ClientBuilder::new(info).build()
    }

    /// Create a new client builder.
    pub fn builder(info: ContractInfo) -> ClientBuilder {
        ClientBuilder::new(info)
    }

    /// Contract this client calls.
    pub fn contract(&self) -> &ContractInfo {
        &self.info
    }

    /// Transport settings, for building transports that match this client.
    pub fn transport_config(&self) -> &TransportConfig {
        &self.config.transport
    }

    /// Signal that aborts pending receives on cancellable transports.
    ///
    /// Cancelling is permanent and shared by every clone of this client:
    /// later calls fail with [`RpcError::Cancelled`] before any I/O. A call
    /// interrupted while waiting for its response leaves the transport out of
    /// step with the peer, so discard it.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Call `method` with typed arguments and decode its typed result.
    ///
    /// Fails with [`RpcError::TargetResolutionFailed`] before any I/O when
    /// the method is not part of the contract or disagrees on arity.
    pub async fn call<T, P, R>(&self, transport: &mut T, method: &Method<P, R>, args: P) -> Result<R>
    where
        T: Transport + ?Sized,
        P: Arguments,
        R: DeserializeOwned,
    {
        let name = method.name();
        if name.is_empty() || self.info.arity(name) != Some(P::ARITY) {
            return Err(RpcError::TargetResolutionFailed(name.to_string()));
        }

        let request = Envelope::for_request(name, args.encode()?);
        let response = self.exchange(transport, request).await?;
        decode_result(&response)
    }

    /// Call an operation by name with pre-encoded argument blobs.
    ///
    /// Fails with [`RpcError::UnknownOperation`] before any I/O when the
    /// contract has no such operation. Returns the raw result blob.
    pub async fn call_named<T>(
        &self,
        transport: &mut T,
        operation: &str,
        arguments: Vec<Option<Vec<u8>>>,
    ) -> Result<Option<Vec<u8>>>
    where
        T: Transport + ?Sized,
    {
        if !self.info.contains(operation) {
            return Err(RpcError::UnknownOperation(operation.to_string()));
        }

        let request = Envelope::for_request(operation, arguments);
        let response = self.exchange(transport, request).await?;
        Ok(response.result_bytes().map(<[u8]>::to_vec))
    }

    /// [`call_named`](Self::call_named), decoding the result as `R`.
    pub async fn call_named_as<T, R>(
        &self,
        transport: &mut T,
        operation: &str,
        arguments: Vec<Option<Vec<u8>>>,
    ) -> Result<R>
    where
        T: Transport + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.call_named(transport, operation, arguments).await?;
        match bytes {
            Some(bytes) => MsgPackCodec::decode(&bytes),
            None => MsgPackCodec::decode(&MSGPACK_NIL),
        }
    }

    /// Tell the server no more requests follow on this transport.
    pub async fn end_session<T>(&self, transport: &mut T) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        send_session_end(transport).await
    }

    async fn exchange<T>(&self, transport: &mut T, request: Envelope) -> Result<Envelope>
    where
        T: Transport + ?Sized,
    {
        if self.cancel.is_cancelled() {
            return Err(RpcError::Cancelled);
        }

        let round_trip = self.round_trip(transport, request);
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| RpcError::Timeout(limit))?,
            None => round_trip.await,
        }
    }

    async fn round_trip<T>(&self, transport: &mut T, request: Envelope) -> Result<Envelope>
    where
        T: Transport + ?Sized,
    {
        tracing::debug!(operation = %request.operation, args = request.arguments.len(), "Sending request");
        send_frame(transport, &request).await?;

        let inbound =
            receive_frame(transport, self.config.transport.max_payload_size, &self.cancel).await?;
        match inbound {
            Inbound::Envelope(response) => {
                if response.operation != request.operation {
                    tracing::warn!(
                        expected = %request.operation,
                        received = %response.operation,
                        "Response names a different operation"
                    );
                }
                Ok(response)
            }
            Inbound::SessionEnded => Err(RpcError::ConnectionClosed),
        }
    }
}

fn decode_result<R: DeserializeOwned>(response: &Envelope) -> Result<R> {
    match response.result_bytes() {
        Some(bytes) => MsgPackCodec::decode(bytes),
        None => MsgPackCodec::decode(&MSGPACK_NIL),
    }
}
