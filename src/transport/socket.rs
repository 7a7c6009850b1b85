//! Raw TCP socket transport.
//!
//! Reads go straight to the socket with no user-space buffer. A pending read
//! is never abandoned, so cancellation only takes effect between messages.

use std::net::SocketAddr;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::{BoxFuture, Transport};
use crate::cancel::CancelSignal;
use crate::config::{TransportConfig, DEFAULT_BLOCK_SIZE};
use crate::error::{Result, RpcError};

/// Transport over a connected `TcpStream`.
pub struct SocketTransport {
    socket: TcpStream,
    block_size: usize,
    usable: bool,
}

impl SocketTransport {
    /// Wrap a connected socket with the default block size.
    pub fn new(socket: TcpStream) -> Self {
        Self::with_block_size(socket, DEFAULT_BLOCK_SIZE)
    }

    /// Wrap a connected socket using `config.block_size` as the read size.
    pub fn with_config(socket: TcpStream, config: &TransportConfig) -> Self {
        Self::with_block_size(socket, config.block_size)
    }

    /// Wrap a connected socket with an explicit read size.
    pub fn with_block_size(socket: TcpStream, block_size: usize) -> Self {
        Self {
            socket,
            block_size: block_size.max(1),
            usable: true,
        }
    }

    /// Connect over TCP with Nagle disabled.
    pub async fn connect<A: ToSocketAddrs>(addr: A, config: &TransportConfig) -> Result<Self> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        Ok(Self::with_config(socket, config))
    }

    /// Remote address of the connection.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.peer_addr()?)
    }
}

impl Transport for SocketTransport {
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        _cancel: &'a CancelSignal,
    ) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            match self.socket.read(buf).await {
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
            self.socket.write_all(buf).await.map_err(|e| {
                self.usable = false;
                RpcError::Io(e)
            })
        })
    }

    fn flush(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Ok(self.socket.flush().await?) })
    }

    fn has_pending_data(&mut self) -> bool {
        // One non-blocking peek: Pending means the kernel queue is empty.
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut probe = [0u8; 1];
        let mut probe = ReadBuf::new(&mut probe);
        match self.socket.poll_peek(&mut cx, &mut probe) {
            Poll::Ready(Ok(n)) => n > 0,
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
            Ok(self.socket.shutdown().await?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn pair() -> (SocketTransport, SocketTransport) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = TransportConfig::default();
        let (client, accepted) = tokio::join!(
            SocketTransport::connect(addr, &config),
            listener.accept()
        );
        (client.unwrap(), SocketTransport::new(accepted.unwrap().0))
    }

    #[tokio::test]
    async fn test_read_write() {
        let (mut client, mut server) = pair().await;
        client.write_all(b"ping").await.unwrap();

        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < 4 {
            filled += server
                .read_some(&mut buf[filled..], &CancelSignal::new())
                .await
                .unwrap();
        }
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_pending_data_peek_does_not_consume() {
        let (mut client, mut server) = pair().await;
        assert!(!server.has_pending_data());

        client.write_all(b"x").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server.has_pending_data());

        let mut buf = [0u8; 1];
        let n = server.read_some(&mut buf, &CancelSignal::new()).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf[0], b'x');
    }

    #[tokio::test]
    async fn test_peer_close_reads_zero() {
        let (mut client, mut server) = pair().await;
        client.shutdown().await.unwrap();
        assert!(!client.is_usable());

        let mut buf = [0u8; 8];
        let n = server.read_some(&mut buf, &CancelSignal::new()).await.unwrap();
        assert_eq!(n, 0);
        assert!(!server.is_usable());
    }
}
