//! Server side: per-connection dispatch loop.
//!
//! A [`Server`] pairs a [`ServiceContract`] with the worker that fulfills it.
//! Each connection runs its own strictly sequential loop:
//! receive, dispatch, send, repeat. Connections share nothing but the
//! worker, which the loop never locks.
//!
//! # Example
//!
//! ```ignore
//! use wirecall::contract::{Method, Reply, ServiceContract};
//! use wirecall::server::Server;
//! use wirecall::CancelSignal;
//!
//! const ADD: Method<(i32, i32), i32> = Method::new("Add");
//!
//! struct Calculator;
//!
//! let contract = ServiceContract::builder("Calculator")
//!     .operation(&ADD, |_calc: Arc<Calculator>, (a, b)| Reply::ready(a + b))
//!     .build();
//!
//! let server = Server::new(contract, Calculator);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7000").await?;
//! server.serve_tcp(listener, CancelSignal::new()).await?;
//! ```

mod hooks;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::cancel::CancelSignal;
use crate::config::ServerConfig;
use crate::contract::ServiceContract;
use crate::error::{OperationError, Result, RpcError};
use crate::protocol::{receive_frame, send_frame, Envelope, Inbound};
use crate::transport::{SocketTransport, Transport};

pub use hooks::Hooks;

/// Builder for configuring a [`Server`].
pub struct ServerBuilder<W> {
    contract: ServiceContract<W>,
    worker: Arc<W>,
    hooks: Hooks,
    config: ServerConfig,
}

impl<W: Send + Sync + 'static> ServerBuilder<W> {
    /// Replace all hooks at once.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// See [`Hooks::on_request`].
    pub fn on_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), OperationError>> + Send + 'static,
    {
        self.hooks = self.hooks.on_request(hook);
        self
    }

    /// See [`Hooks::on_response`].
    pub fn on_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), OperationError>> + Send + 'static,
    {
        self.hooks = self.hooks.on_response(hook);
        self
    }

    /// See [`Hooks::on_error`].
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RpcError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks = self.hooks.on_error(hook);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Largest request payload accepted.
    ///
    /// Default: 1 GB
    pub fn max_payload_size(mut self, max: u64) -> Self {
        self.config.transport.max_payload_size = max;
        self
    }

    /// Read size for sockets accepted by [`Server::serve_tcp`].
    ///
    /// Default: 64 KB
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.transport.block_size = block_size;
        self
    }

    /// Build the server.
    pub fn build(self) -> Server<W> {
        Server {
            contract: Arc::new(self.contract),
            worker: self.worker,
            hooks: self.hooks,
            config: self.config,
        }
    }
}

/// Serves one contract backed by one shared worker.
pub struct Server<W> {
    contract: Arc<ServiceContract<W>>,
    worker: Arc<W>,
    hooks: Hooks,
    config: ServerConfig,
}

impl<W> Clone for Server<W> {
    fn clone(&self) -> Self {
        Self {
            contract: Arc::clone(&self.contract),
            worker: Arc::clone(&self.worker),
            hooks: self.hooks.clone(),
            config: self.config.clone(),
        }
    }
}

impl<W: Send + Sync + 'static> Server<W> {
    /// Server with no hooks and default configuration.
    pub fn new(contract: ServiceContract<W>, worker: W) -> Self {
        Self::builder(contract, Arc::new(worker)).build()
    }

    /// Create a new server builder around a shared worker.
    pub fn builder(contract: ServiceContract<W>, worker: Arc<W>) -> ServerBuilder<W> {
        ServerBuilder {
            contract,
            worker,
            hooks: Hooks::default(),
            config: ServerConfig::default(),
        }
    }

    /// Contract being served.
    pub fn contract(&self) -> &ServiceContract<W> {
        &self.contract
    }

    /// Worker shared by every connection.
    pub fn worker(&self) -> &Arc<W> {
        &self.worker
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the dispatch loop for one connection until it closes.
    ///
    /// The loop stops normally when the peer ends the session, when `cancel`
    /// fires, or when the transport stops being usable. Any other failure
    /// closes the loop and goes to the error hook; without one it is returned.
    /// The transport is shut down exactly once on every path.
    pub async fn run_connection<T: Transport>(
        &self,
        mut transport: T,
        cancel: CancelSignal,
    ) -> Result<()> {
        let outcome = self.serve(&mut transport, &cancel).await;

        if let Err(e) = transport.shutdown().await {
            tracing::debug!(error = %e, "Transport shutdown failed");
        }

        match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "Dispatch loop closed with error");
                self.hooks.loop_failed(e).await
            }
        }
    }

    async fn serve<T: Transport>(&self, transport: &mut T, cancel: &CancelSignal) -> Result<()> {
        let max_payload_size = self.config.transport.max_payload_size;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!("Dispatch loop cancelled");
                return Ok(());
            }
            if !transport.is_usable() {
                tracing::debug!("Transport no longer usable");
                return Ok(());
            }

            // 1. Receive
            let request = match receive_frame(transport, max_payload_size, cancel).await {
                Ok(Inbound::Envelope(request)) => request,
                Ok(Inbound::SessionEnded) => {
                    tracing::debug!("Session ended by peer");
                    return Ok(());
                }
                Err(RpcError::Cancelled) => {
                    tracing::debug!("Receive cancelled");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            // 2. Dispatch
            self.hooks.request_received(&request).await?;
            tracing::debug!(
                operation = %request.operation,
                args = request.arguments.len(),
                "Dispatching"
            );
            let response = self.contract.dispatch(&self.worker, &request).await?;

            // 3. Send
            self.hooks.response_ready(&response).await?;
            send_frame(transport, &response).await?;
        }
    }

    /// Run [`run_connection`](Self::run_connection) on its own task.
    pub fn spawn_connection<T>(&self, transport: T) -> ConnectionHandle
    where
        T: Transport + 'static,
    {
        let cancel = CancelSignal::new();
        let server = self.clone();
        let signal = cancel.clone();
        let join = tokio::spawn(async move { server.run_connection(transport, signal).await });

        ConnectionHandle { cancel, join }
    }

    /// Accept TCP connections until `cancel` fires, running one dispatch
    /// loop per socket.
    ///
    /// Every connection observes the same `cancel`. Loops still blocked in a
    /// socket read finish once their current message completes or the peer
    /// hangs up.
    pub async fn serve_tcp(&self, listener: TcpListener, cancel: CancelSignal) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, contract = %self.contract.name(), "Listening");
        }

        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Listener stopped");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };

            let (socket, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
            };
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(%peer, error = %e, "Could not disable Nagle");
            }

            let transport = SocketTransport::with_config(socket, &self.config.transport);
            let server = self.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move {
                tracing::info!(%peer, "Connection opened");
                match server.run_connection(transport, cancel).await {
                    Ok(()) => tracing::info!(%peer, "Connection closed"),
                    Err(e) => tracing::error!(%peer, error = %e, "Connection failed"),
                }
            });
        }
    }
}

/// Handle to a dispatch loop started by [`Server::spawn_connection`].
#[derive(Debug)]
pub struct ConnectionHandle {
    cancel: CancelSignal,
    join: JoinHandle<Result<()>>,
}

impl ConnectionHandle {
    /// Ask the loop to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Signal observed by the loop.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// True once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to exit and return its outcome.
    pub async fn join(self) -> Result<()> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(RpcError::Cancelled),
        }
    }
}
