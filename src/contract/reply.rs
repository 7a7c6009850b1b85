//! Immediate or deferred operation results.

use std::fmt;
use std::future::Future;

use crate::error::OperationError;
use crate::transport::BoxFuture;

/// Value produced by an operation handler.
///
/// Synchronous operations return [`Reply::Immediate`]; asynchronous ones
/// return [`Reply::Deferred`]. The invoker awaits both the same way.
pub enum Reply<T> {
    /// Already computed.
    Immediate(Result<T, OperationError>),
    /// Completes later.
    Deferred(BoxFuture<'static, Result<T, OperationError>>),
}

impl<T> Reply<T> {
    /// Successful immediate value.
    pub fn ready(value: T) -> Self {
        Reply::Immediate(Ok(value))
    }

    /// Immediate failure.
    pub fn failed(error: impl Into<OperationError>) -> Self {
        Reply::Immediate(Err(error.into()))
    }

    /// Wrap a future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, OperationError>> + Send + 'static,
    {
        Reply::Deferred(Box::pin(future))
    }

    /// True for [`Reply::Deferred`].
    pub fn is_deferred(&self) -> bool {
        matches!(self, Reply::Deferred(_))
    }

    /// Wait for the value.
    pub async fn resolve(self) -> Result<T, OperationError> {
        match self {
            Reply::Immediate(result) => result,
            Reply::Deferred(future) => future.await,
        }
    }
}

impl<T> From<Result<T, OperationError>> for Reply<T> {
    fn from(result: Result<T, OperationError>) -> Self {
        Reply::Immediate(result)
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Immediate(Ok(_)) => f.write_str("Reply::Immediate(Ok(..))"),
            Reply::Immediate(Err(e)) => write!(f, "Reply::Immediate(Err({e}))"),
            Reply::Deferred(_) => f.write_str("Reply::Deferred(..)"),
        }
    }
}
