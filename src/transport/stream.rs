//! Buffered duplex stream transport.
//!
//! Wraps any `AsyncRead + AsyncWrite` (TCP stream, Unix socket, in-memory
//! duplex) in a `BufReader`. Reads race the cancel signal, so a pending
//! receive can be aborted.
//!
//! # Example
//!
//! ```ignore
//! use wirecall::transport::StreamTransport;
//!
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:7000").await?;
//! let transport = StreamTransport::new(stream);
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::{BoxFuture, Transport};
use crate::cancel::CancelSignal;
use crate::config::{TransportConfig, DEFAULT_BLOCK_SIZE};
use crate::error::{Result, RpcError};
use crate::protocol::HEADER_SIZE;

/// Transport over a buffered duplex stream.
pub struct StreamTransport<S> {
    inner: BufReader<S>,
    block_size: usize,
    usable: bool,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a stream with the default block size.
    pub fn new(stream: S) -> Self {
        Self::with_block_size(stream, DEFAULT_BLOCK_SIZE)
    }

    /// Wrap a stream using `config.block_size` for the read buffer.
    pub fn with_config(stream: S, config: &TransportConfig) -> Self {
        Self::with_block_size(stream, config.block_size)
    }

    /// Wrap a stream with an explicit read size.
    ///
    /// The read buffer always holds at least one header.
    pub fn with_block_size(stream: S, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            inner: BufReader::with_capacity(block_size.max(HEADER_SIZE), stream),
            block_size,
            usable: true,
        }
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }

    /// Unwrap the stream. Buffered, unread bytes are discarded.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

impl StreamTransport<TcpStream> {
    /// Connect over TCP.
    pub async fn connect<A: ToSocketAddrs>(addr: A, config: &TransportConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::with_config(stream, config))
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        cancel: &'a CancelSignal,
    ) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RpcError::Cancelled),
                r = self.inner.read(buf) => r,
            };

            match result {
                Ok(0) => {
                    self.usable = false;
                    Ok(0)
                }
                Ok(n) => Ok(n),
                Err(e) => {
                    self.usable = false;
                    Err(RpcError::Io(e))
                }
            }
        })
    }

    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.inner.get_mut().write_all(buf).await.map_err(|e| {
                self.usable = false;
                RpcError::Io(e)
            })
        })
    }

    fn flush(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Ok(self.inner.get_mut().flush().await?) })
    }

    fn has_pending_data(&mut self) -> bool {
        if !self.inner.buffer().is_empty() {
            return true;
        }
        // One non-blocking fill; bytes read here stay buffered for the next read.
        let mut cx = Context::from_waker(noop_waker_ref());
        match Pin::new(&mut self.inner).poll_fill_buf(&mut cx) {
            Poll::Ready(Ok(buf)) => !buf.is_empty(),
            Poll::Ready(Err(_)) | Poll::Pending => false,
        }
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.usable = false;
            Ok(self.inner.get_mut().shutdown().await?)
        })
    }
}
