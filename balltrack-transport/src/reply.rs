//! Reply session: the responder half of the control channel
//!
//! Binds the control port, serves one client at a time, and enforces the
//! strict receive-then-send turn-taking the pattern guarantees: every
//! consumed request must be answered (or explicitly declined) before the
//! next receive.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::debug;

use balltrack_core::codec;

use crate::error::{Error, Result};
use crate::frame::{self, FramedStream};
use crate::{Pattern, Session};

/// Responder endpoint of a request/reply pair
pub struct ReplySession {
    port: u16,
    listener: Option<TcpListener>,
    peer: Option<FramedStream>,
    owes_reply: bool,
}

impl ReplySession {
    /// Create an unbound reply session on the given port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            listener: None,
            peer: None,
            owes_reply: false,
        }
    }

    /// Check if a consumed request still awaits its reply
    pub fn owes_reply(&self) -> bool {
        self.owes_reply
    }

    /// Receive one raw frame, waiting at most `wait`
    ///
    /// Consuming a frame obligates this session to [`send`](Self::send) or
    /// [`decline`](Self::decline) before the next receive, even when the
    /// frame later turns out to be undecodable.
    pub async fn recv_frame_timeout(&mut self, wait: Duration) -> Result<Option<Bytes>> {
        self.recv_frame_at(Some(Instant::now() + wait)).await
    }

    async fn recv_frame_at(&mut self, deadline: Option<Instant>) -> Result<Option<Bytes>> {
        if self.owes_reply {
            return Err(Error::ProtocolViolation(
                "receive on a reply session that owes a reply",
            ));
        }
        let listener = self.listener.as_ref().ok_or(Error::NotStarted)?;

        loop {
            let Some(peer) = self.peer.as_mut() else {
                match frame::until(deadline, listener.accept()).await {
                    None => return Ok(None),
                    Some(Ok((stream, addr))) => {
                        debug!("Accepted control peer {addr}");
                        stream.set_nodelay(true)?;
                        self.peer = Some(FramedStream::new(stream));
                    }
                    Some(Err(e)) => return Err(e.into()),
                }
                continue;
            };

            match peer.recv_frame(deadline).await {
                Ok(Some(frame)) => {
                    self.owes_reply = true;
                    return Ok(Some(frame));
                }
                Ok(None) => return Ok(None),
                Err(e) if e.is_disconnect() => {
                    // Wait for the next client on the same listener
                    debug!("Control peer lost: {e}");
                    self.peer = None;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Receive and decode one message, blocking until it arrives
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        loop {
            if let Some(frame) = self.recv_frame_at(None).await? {
                match codec::decode(&frame)? {
                    Some(msg) => return Ok(msg),
                    // A frame holding zero messages owes nothing
                    None => self.owes_reply = false,
                }
            }
        }
    }

    /// Receive and decode one message, waiting at most `wait`
    ///
    /// `Ok(None)` is the no-message sentinel. A decode failure leaves the
    /// reply owed; callers answer it or [`decline`](Self::decline).
    pub async fn recv_timeout<T: DeserializeOwned>(&mut self, wait: Duration) -> Result<Option<T>> {
        match self.recv_frame_timeout(wait).await? {
            Some(frame) => match codec::decode(&frame)? {
                Some(msg) => Ok(Some(msg)),
                None => {
                    self.owes_reply = false;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Receive and decode one message without waiting
    pub async fn try_recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        self.recv_timeout(Duration::ZERO).await
    }

    /// Send the reply to the request consumed last
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        if !self.owes_reply {
            return Err(Error::ProtocolViolation(
                "send on a reply session with no request pending",
            ));
        }
        let peer = self.peer.as_mut().ok_or(Error::NotStarted)?;
        let payload = codec::encode(msg).map_err(Error::Codec)?;

        let sent = peer.send_frame(&payload).await;
        if let Err(e) = &sent {
            if e.is_disconnect() {
                debug!("Control peer lost while replying: {e}");
                self.peer = None;
            }
        }
        // The requester either got its answer or is gone; the turn is over.
        self.owes_reply = false;
        sent
    }

    /// Drop the obligation to answer the request consumed last
    ///
    /// Used when the request could not be decoded and no reply will be
    /// sent; keeps the session receivable for the next request.
    pub fn decline(&mut self) -> Result<()> {
        if !self.owes_reply {
            return Err(Error::ProtocolViolation(
                "decline on a reply session with no request pending",
            ));
        }
        self.owes_reply = false;
        Ok(())
    }

    /// Reply, then wait for the next request
    ///
    /// Exposed for symmetry with [`RequestSession::send_receive`]; the
    /// dispatcher drives receive and send separately.
    ///
    /// [`RequestSession::send_receive`]: crate::request::RequestSession::send_receive
    pub async fn send_receive<T: Serialize, R: DeserializeOwned>(&mut self, msg: &T) -> Result<R> {
        self.send(msg).await?;
        self.recv().await
    }
}

#[async_trait]
impl Session for ReplySession {
    fn pattern(&self) -> Pattern {
        Pattern::Reply
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn is_connected(&self) -> bool {
        self.listener.is_some()
    }

    async fn start(&mut self, host: &str) -> Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let listener = frame::bind_listener(host, self.port).await?;
        debug!("Reply session bound on {host}:{}", self.port);
        self.listener = Some(listener);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut peer) = self.peer.take() {
            peer.shutdown().await;
        }
        self.listener = None;
        self.owes_reply = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_is_idempotent() {
        let mut session = ReplySession::new(5701);
        assert!(!session.is_connected());

        session.start("127.0.0.1").await.unwrap();
        assert!(session.is_connected());
        // Second start is a no-op
        session.start("127.0.0.1").await.unwrap();
        assert!(session.is_connected());

        session.stop().await.unwrap();
        assert!(!session.is_connected());
        // Second stop is a no-op
        session.stop().await.unwrap();
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_occupied_port_is_reported() {
        let mut first = ReplySession::new(5702);
        first.start("127.0.0.1").await.unwrap();

        let mut second = ReplySession::new(5702);
        let result = second.start("127.0.0.1").await;
        assert!(matches!(result, Err(Error::AddressInUse { .. })));
    }

    #[tokio::test]
    async fn test_recv_before_start_fails() {
        let mut session = ReplySession::new(5703);
        let result = session.recv_frame_timeout(Duration::ZERO).await;
        assert!(matches!(result, Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn test_send_without_pending_request_fails() {
        let mut session = ReplySession::new(5704);
        session.start("127.0.0.1").await.unwrap();

        let result = session.send(&"orphan reply").await;
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }
}
