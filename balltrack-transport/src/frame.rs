//! Length-prefixed framing over TCP
//!
//! Every message travels as `[u32 big-endian payload length][payload]`.
//! Publish/subscribe payloads additionally lead with `[topic][0x00]` so a
//! subscriber can filter before decoding.
//!
//! Reads accumulate into a buffer and frames are parsed out of it, so a
//! receive that times out mid-frame keeps the partial bytes and the next
//! receive resumes exactly where the stream left off.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{self, Instant};
use tracing::trace;

use crate::error::{Error, Result};

/// Length prefix size in bytes
pub const LEN_PREFIX_SIZE: usize = 4;

/// Maximum frame payload size (16 MiB; a stereo JPEG pair fits comfortably)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// One TCP stream speaking length-prefixed frames
pub(crate) struct FramedStream {
    stream: TcpStream,
    buf: BytesMut,
}

impl FramedStream {
    pub(crate) fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Write one frame and flush it
    pub(crate) async fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        trace!("Sending frame of {} bytes", payload.len());

        self.stream
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Parse one complete frame out of the read buffer, if there is one
    fn take_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buf.len() < LEN_PREFIX_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes(self.buf[..LEN_PREFIX_SIZE].try_into().unwrap()) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }
        if self.buf.len() < LEN_PREFIX_SIZE + len {
            return Ok(None);
        }

        self.buf.advance(LEN_PREFIX_SIZE);
        let frame = self.buf.split_to(len).freeze();
        trace!("Received frame of {} bytes", frame.len());
        Ok(Some(frame))
    }

    /// Read one frame, waiting until `deadline` (or indefinitely without one)
    ///
    /// `Ok(None)` means nothing complete arrived in time; partial bytes
    /// stay buffered for the next call.
    pub(crate) async fn recv_frame(&mut self, deadline: Option<Instant>) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }
            match until(deadline, self.stream.read_buf(&mut self.buf)).await {
                None => return Ok(None),
                Some(Ok(0)) => return Err(Error::ConnectionClosed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Graceful shutdown; errors are irrelevant at teardown
    pub(crate) async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// Await `fut`, bounded by `deadline` when one is given
///
/// `None` means the deadline passed first. The future gets polled at least
/// once even with an already-expired deadline, so zero-wait polls still
/// drain anything ready.
pub(crate) async fn until<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Prefix a publish payload with its topic
pub(crate) fn encode_topic_payload(topic: &str, payload: &[u8]) -> Result<Vec<u8>> {
    if topic.as_bytes().contains(&0) {
        return Err(Error::ProtocolViolation("topic contains a NUL byte"));
    }
    let mut buf = Vec::with_capacity(topic.len() + 1 + payload.len());
    buf.extend_from_slice(topic.as_bytes());
    buf.push(0);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Split a publish frame into its topic and payload
pub(crate) fn split_topic_payload(frame: &Bytes) -> Result<(String, Bytes)> {
    let pos = frame
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::ProtocolViolation(
            "publish frame missing topic separator",
        ))?;
    let topic = std::str::from_utf8(&frame[..pos])
        .map_err(|_| Error::ProtocolViolation("topic is not UTF-8"))?
        .to_string();
    Ok((topic, frame.slice(pos + 1..)))
}

/// Bind a listener, mapping the occupied-port case to its own error
pub(crate) async fn bind_listener(host: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{host}:{port}");
    match TcpListener::bind(&addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => Err(Error::AddressInUse { addr }),
        Err(e) => Err(e.into()),
    }
}

/// Connect to a bound peer within `connect_timeout`
pub(crate) async fn connect_stream(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<TcpStream> {
    let addr = format!("{host}:{port}");
    let stream = time::timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::ConnectTimeout { addr: addr.clone() })?
        .map_err(|source| Error::Connect { addr, source })?;
    // Control messages are small; never batch them
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Accept a pending connection without waiting for one
pub(crate) async fn try_accept(listener: &TcpListener) -> Result<Option<(TcpStream, SocketAddr)>> {
    match time::timeout(Duration::ZERO, listener.accept()).await {
        Ok(Ok(pair)) => Ok(Some(pair)),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn loopback_pair() -> (FramedStream, FramedStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (FramedStream::new(client), FramedStream::new(server))
    }

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut tx, mut rx) = loopback_pair().await;

        tx.send_frame(b"hello").await.unwrap();
        let frame = rx.recv_frame(None).await.unwrap().unwrap();
        assert_eq!(frame.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_empty_frame_round_trip() {
        let (mut tx, mut rx) = loopback_pair().await;

        tx.send_frame(b"").await.unwrap();
        let frame = rx.recv_frame(None).await.unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_back_to_back_frames_stay_separate() {
        let (mut tx, mut rx) = loopback_pair().await;

        tx.send_frame(b"first").await.unwrap();
        tx.send_frame(b"second").await.unwrap();

        let first = rx.recv_frame(None).await.unwrap().unwrap();
        let second = rx.recv_frame(None).await.unwrap().unwrap();
        assert_eq!(first.as_ref(), b"first");
        assert_eq!(second.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_recv_timeout_returns_none() {
        let (_tx, mut rx) = loopback_pair().await;

        let deadline = Some(Instant::now() + Duration::from_millis(20));
        let got = rx.recv_frame(deadline).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut tx, mut rx) = loopback_pair().await;

        // Forge a length prefix past the limit
        let bad_len = (MAX_FRAME_SIZE as u32 + 1).to_be_bytes();
        tx.stream.write_all(&bad_len).await.unwrap();
        tx.stream.flush().await.unwrap();

        let deadline = Some(Instant::now() + Duration::from_millis(100));
        let result = rx.recv_frame(deadline).await;
        assert!(matches!(result, Err(Error::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_closed_peer_is_reported() {
        let (tx, mut rx) = loopback_pair().await;
        drop(tx);

        let result = rx.recv_frame(None).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_topic_payload_round_trip() {
        let buf = encode_topic_payload("camera.feed", b"\x00payload").unwrap();
        let (topic, payload) = split_topic_payload(&Bytes::from(buf)).unwrap();
        assert_eq!(topic, "camera.feed");
        assert_eq!(payload.as_ref(), b"\x00payload");
    }

    #[test]
    fn test_topic_with_nul_is_rejected() {
        let result = encode_topic_payload("bad\0topic", b"payload");
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_frame_without_separator_is_rejected() {
        let result = split_topic_payload(&Bytes::from_static(b"no separator"));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }
}
