//! Frame I/O on top of any [`Transport`].
//!
//! A frame is one 14-byte header plus exactly `length` payload bytes. Both
//! directions are written once here; transports only move bytes.

use bytes::{BufMut, Bytes, BytesMut};

use super::envelope::{Envelope, Inbound};
use super::wire_format::{decode_header, encode_header, validate_length, HeaderKind, HEADER_SIZE};
use crate::cancel::CancelSignal;
use crate::error::{Result, RpcError};
use crate::transport::Transport;

/// Receive one envelope.
///
/// Returns [`Inbound::SessionEnded`] when the peer closes before sending
/// any header byte, or when it sends the all-zero sentinel with nothing
/// behind it. A connection that drops mid-frame is
/// [`RpcError::ConnectionClosed`].
pub async fn receive_frame<T>(
    transport: &mut T,
    max_payload_size: u64,
    cancel: &CancelSignal,
) -> Result<Inbound>
where
    T: Transport + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;

    while filled < HEADER_SIZE {
        let n = transport.read_some(&mut header[filled..], cancel).await?;
        if n == 0 {
            if filled == 0 {
                tracing::debug!("Peer closed before next header");
                return Ok(Inbound::SessionEnded);
            }
            return Err(RpcError::ConnectionClosed);
        }
        filled += n;
    }

    let length = match decode_header(&header, transport.has_pending_data())? {
        HeaderKind::SessionEnded => {
            tracing::debug!("Received session-end sentinel");
            return Ok(Inbound::SessionEnded);
        }
        HeaderKind::Frame(length) => length,
    };
    validate_length(length, max_payload_size)?;

    let payload = read_payload(transport, length, cancel).await?;
    tracing::trace!(len = payload.len(), "Frame received");

    Envelope::decode(&payload).map(Inbound::Envelope)
}

/// Read exactly `length` bytes, one block at a time.
async fn read_payload<T>(transport: &mut T, length: u64, cancel: &CancelSignal) -> Result<Bytes>
where
    T: Transport + ?Sized,
{
    let length = usize::try_from(length).map_err(|_| RpcError::PayloadTooLarge {
        length,
        max: usize::MAX as u64,
    })?;
    let block_size = transport.block_size();
    let mut scratch = vec![0u8; block_size.min(length)];
    let mut payload = BytesMut::with_capacity(block_size.min(length));

    while payload.len() < length {
        let want = (length - payload.len()).min(scratch.len());
        let n = transport.read_some(&mut scratch[..want], cancel).await?;
        if n == 0 {
            return Err(RpcError::ConnectionClosed);
        }
        payload.put_slice(&scratch[..n]);
    }

    Ok(payload.freeze())
}

/// Serialize `envelope` and write it as one frame.
///
/// The header is built from the serialized length.
pub async fn send_frame<T>(transport: &mut T, envelope: &Envelope) -> Result<()>
where
    T: Transport + ?Sized,
{
    let payload = envelope.encode()?;
    let header = encode_header(payload.len() as u64);

    transport.write_all(&header).await?;
    transport.write_all(&payload).await?;
    transport.flush().await?;

    tracing::trace!(operation = %envelope.operation, len = payload.len(), "Frame sent");
    Ok(())
}

/// Write the all-zero sentinel telling the peer no more requests follow.
pub async fn send_session_end<T>(transport: &mut T) -> Result<()>
where
    T: Transport + ?Sized,
{
    transport.write_all(&[0u8; HEADER_SIZE]).await?;
    transport.flush().await
}

/// Encode a whole frame into one buffer.
///
/// # Example
///
/// ```
/// use wirecall::protocol::{build_frame, Envelope, HEADER_SIZE};
///
/// let envelope = Envelope::for_request("Ping", Vec::new());
/// let bytes = build_frame(&envelope).unwrap();
/// assert_eq!(bytes.len(), HEADER_SIZE + envelope.encode().unwrap().len());
/// ```
pub fn build_frame(envelope: &Envelope) -> Result<Vec<u8>> {
    let payload = envelope.encode()?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_header(payload.len() as u64));
    buf.extend_from_slice(&payload);
    Ok(buf)
}
