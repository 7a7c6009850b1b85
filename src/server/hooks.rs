//! Lifecycle hooks for the dispatch loop.
//!
//! Every hook is awaited in place. A hook that wants fire-and-forget
//! behavior spawns its own task.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{OperationError, Result, RpcError};
use crate::protocol::Envelope;
use crate::transport::BoxFuture;

type EnvelopeHook =
    Arc<dyn Fn(Envelope) -> BoxFuture<'static, std::result::Result<(), OperationError>> + Send + Sync>;
type ErrorHook = Arc<dyn Fn(RpcError) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Optional observers of a connection's dispatch loop.
///
/// - `on_request` sees each decoded request before it is dispatched.
/// - `on_response` sees each response before it is sent.
/// - `on_error` receives the error that closed the loop. Returning `Ok(())`
///   absorbs it; returning `Err` hands it to whoever runs the loop.
///
/// A failing `on_request` or `on_response` closes the loop with
/// [`RpcError::Hook`], which then goes through `on_error` like any other
/// failure.
///
/// # Example
///
/// ```
/// use wirecall::server::Hooks;
///
/// let hooks = Hooks::new()
///     .on_request(|request| async move {
///         tracing::info!(operation = %request.operation, "request");
///         Ok(())
///     })
///     .on_error(|error| async move {
///         tracing::warn!(%error, "connection failed");
///         Ok(())
///     });
/// assert!(hooks.has_error_hook());
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    on_request: Option<EnvelopeHook>,
    on_response: Option<EnvelopeHook>,
    on_error: Option<ErrorHook>,
}

impl Hooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe each request before dispatch.
    pub fn on_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), OperationError>> + Send + 'static,
    {
        self.on_request = Some(Arc::new(move |envelope| Box::pin(hook(envelope))));
        self
    }

    /// Observe each response before it is sent.
    pub fn on_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), OperationError>> + Send + 'static,
    {
        self.on_response = Some(Arc::new(move |envelope| Box::pin(hook(envelope))));
        self
    }

    /// Decide what happens to the error that closed the loop.
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RpcError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error| Box::pin(hook(error))));
        self
    }

    /// True if an error hook is installed.
    pub fn has_error_hook(&self) -> bool {
        self.on_error.is_some()
    }

    pub(crate) async fn request_received(&self, request: &Envelope) -> Result<()> {
        match &self.on_request {
            Some(hook) => hook(request.clone()).await.map_err(RpcError::Hook),
            None => Ok(()),
        }
    }

    pub(crate) async fn response_ready(&self, response: &Envelope) -> Result<()> {
        match &self.on_response {
            Some(hook) => hook(response.clone()).await.map_err(RpcError::Hook),
            None => Ok(()),
        }
    }

    /// Without an error hook the error propagates unchanged.
    pub(crate) async fn loop_failed(&self, error: RpcError) -> Result<()> {
        match &self.on_error {
            Some(hook) => hook(error).await,
            None => Err(error),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
