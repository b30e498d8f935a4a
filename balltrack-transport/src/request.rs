//! Request session: the asking half of the control channel
//!
//! Connects to a bound reply session. Sends alternate with receives: a
//! request must collect its reply before the next request goes out.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::time::Instant;
use tracing::debug;

use balltrack_core::codec;

use crate::error::{Error, Result};
use crate::frame::{self, FramedStream};
use crate::{DEFAULT_CONNECT_TIMEOUT, Pattern, Session};

/// Requester endpoint of a request/reply pair
pub struct RequestSession {
    port: u16,
    connect_timeout: Duration,
    peer: Option<FramedStream>,
    reply_pending: bool,
}

impl RequestSession {
    /// Create an unconnected request session for the given port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            peer: None,
            reply_pending: false,
        }
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check if a sent request still awaits its reply
    pub fn reply_pending(&self) -> bool {
        self.reply_pending
    }

    /// Send one request
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        if self.reply_pending {
            return Err(Error::ProtocolViolation(
                "send on a request session with a reply pending",
            ));
        }
        let peer = self.peer.as_mut().ok_or(Error::NotStarted)?;
        let payload = codec::encode(msg).map_err(Error::Codec)?;
        peer.send_frame(&payload).await?;
        self.reply_pending = true;
        Ok(())
    }

    async fn recv_at<T: DeserializeOwned>(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<T>> {
        if !self.reply_pending {
            return Err(Error::ProtocolViolation(
                "receive on a request session with no request outstanding",
            ));
        }
        let peer = self.peer.as_mut().ok_or(Error::NotStarted)?;

        match peer.recv_frame(deadline).await {
            Ok(Some(frame)) => {
                self.reply_pending = false;
                Ok(codec::decode(&frame)?)
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if e.is_disconnect() {
                    debug!("Reply peer lost: {e}");
                    self.peer = None;
                    self.reply_pending = false;
                }
                Err(e)
            }
        }
    }

    /// Receive the pending reply, blocking until it arrives
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        match self.recv_at(None).await? {
            Some(msg) => Ok(msg),
            None => Err(Error::ProtocolViolation("peer sent an empty reply")),
        }
    }

    /// Receive the pending reply, waiting at most `wait`
    ///
    /// `Ok(None)` is the no-message sentinel; the reply stays pending.
    pub async fn recv_timeout<T: DeserializeOwned>(&mut self, wait: Duration) -> Result<Option<T>> {
        self.recv_at(Some(Instant::now() + wait)).await
    }

    /// Receive the pending reply without waiting
    pub async fn try_recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        self.recv_timeout(Duration::ZERO).await
    }

    /// Send one request and block for its reply
    pub async fn send_receive<T: Serialize, R: DeserializeOwned>(&mut self, msg: &T) -> Result<R> {
        self.send(msg).await?;
        self.recv().await
    }
}

#[async_trait]
impl Session for RequestSession {
    fn pattern(&self) -> Pattern {
        Pattern::Request
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    async fn start(&mut self, host: &str) -> Result<()> {
        if self.peer.is_some() {
            return Ok(());
        }
        let stream = frame::connect_stream(host, self.port, self.connect_timeout).await?;
        debug!("Request session connected to {host}:{}", self.port);
        self.peer = Some(FramedStream::new(stream));
        self.reply_pending = false;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut peer) = self.peer.take() {
            peer.shutdown().await;
        }
        self.reply_pending = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_nothing_fails() {
        let mut session = RequestSession::new(5711).with_connect_timeout(Duration::from_millis(200));
        let result = session.start("127.0.0.1").await;
        assert!(matches!(
            result,
            Err(Error::Connect { .. }) | Err(Error::ConnectTimeout { .. })
        ));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_send_before_start_fails() {
        let mut session = RequestSession::new(5712);
        let result = session.send(&"hello").await;
        assert!(matches!(result, Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn test_recv_without_request_fails() {
        let mut session = RequestSession::new(5713);
        let result = session.try_recv::<String>().await;
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }
}
