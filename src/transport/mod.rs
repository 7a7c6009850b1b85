//! Transport module - uniform byte I/O over different connection kinds.
//!
//! Provides:
//! - [`Transport`] - read/write/disconnect-detection contract
//! - [`StreamTransport`] - buffered duplex stream, cancellable mid-read
//! - [`SocketTransport`] - raw TCP socket, cancellable between messages
//!
//! Framing lives in [`crate::protocol`] and is written once against this trait.

mod socket;
mod stream;

use std::future::Future;
use std::pin::Pin;

use crate::cancel::CancelSignal;
use crate::error::Result;

pub use socket::SocketTransport;
pub use stream::StreamTransport;

/// Boxed future used at trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Byte-level contract every transport satisfies.
pub trait Transport: Send {
    /// Read at most `buf.len()` bytes. `Ok(0)` means the peer closed.
    ///
    /// Transports that can interrupt a pending read return
    /// [`RpcError::Cancelled`](crate::RpcError::Cancelled) once `cancel` fires;
    /// the others ignore it until the read completes.
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        cancel: &'a CancelSignal,
    ) -> BoxFuture<'a, Result<usize>>;

    /// Write the whole buffer.
    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Flush buffered writes.
    fn flush(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Whether bytes are already available without waiting.
    fn has_pending_data(&mut self) -> bool;

    /// Preferred read size.
    fn block_size(&self) -> usize;

    /// False once a read hit end-of-stream or an I/O error.
    fn is_usable(&self) -> bool;

    /// Shut down the write side and release the connection.
    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        cancel: &'a CancelSignal,
    ) -> BoxFuture<'a, Result<usize>> {
        (**self).read_some(buf, cancel)
    }

    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        (**self).write_all(buf)
    }

    fn flush(&mut self) -> BoxFuture<'_, Result<()>> {
        (**self).flush()
    }

    fn has_pending_data(&mut self) -> bool {
        (**self).has_pending_data()
    }

    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn is_usable(&self) -> bool {
        (**self).is_usable()
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>> {
        (**self).shutdown()
    }
}
