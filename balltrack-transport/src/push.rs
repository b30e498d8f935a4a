//! Push session: the producing half of the camera-feed channel
//!
//! Binds the feed port and sends fire-and-forget frames to whichever
//! consumer is currently connected. Sends are best-effort: with no
//! consumer present the frame is dropped, so a slow or absent client can
//! never stall frame acquisition.

use async_trait::async_trait;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, trace};

use balltrack_core::codec;

use crate::error::{Error, Result};
use crate::frame::{self, FramedStream};
use crate::{Pattern, Session};

/// Producer endpoint of a push/pull pair
pub struct PushSession {
    port: u16,
    listener: Option<TcpListener>,
    peer: Option<FramedStream>,
}

impl PushSession {
    /// Create an unbound push session on the given port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            listener: None,
            peer: None,
        }
    }

    /// Check if a consumer is currently connected
    pub fn has_consumer(&self) -> bool {
        self.peer.is_some()
    }

    /// Send one message, best-effort
    ///
    /// Adopts a newly connected consumer first. Without one the frame is
    /// dropped silently; a write failure drops the dead consumer and
    /// surfaces, leaving the next send free to adopt a fresh one.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let listener = self.listener.as_ref().ok_or(Error::NotStarted)?;

        if self.peer.is_none() {
            if let Some((stream, addr)) = frame::try_accept(listener).await? {
                debug!("Accepted feed consumer {addr}");
                stream.set_nodelay(true)?;
                self.peer = Some(FramedStream::new(stream));
            }
        }

        let Some(peer) = self.peer.as_mut() else {
            trace!("No feed consumer connected, dropping frame");
            return Ok(());
        };

        let payload = codec::encode(msg).map_err(Error::Codec)?;
        match peer.send_frame(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Feed consumer lost: {e}");
                self.peer = None;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Session for PushSession {
    fn pattern(&self) -> Pattern {
        Pattern::Push
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
        debug!("Push session bound on {host}:{}", self.port);
        self.listener = Some(listener);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut peer) = self.peer.take() {
            peer.shutdown().await;
        }
        self.listener = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_is_idempotent() {
        let mut session = PushSession::new(5721);
        session.start("127.0.0.1").await.unwrap();
        session.start("127.0.0.1").await.unwrap();
        assert!(session.is_connected());

        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_send_without_consumer_drops_frame() {
        let mut session = PushSession::new(5722);
        session.start("127.0.0.1").await.unwrap();

        // Nothing is connected; the frame goes nowhere and that is fine
        session.send(&"into the void").await.unwrap();
        assert!(!session.has_consumer());
    }

    #[tokio::test]
    async fn test_send_before_start_fails() {
        let mut session = PushSession::new(5723);
        let result = session.send(&"too early").await;
        assert!(matches!(result, Err(Error::NotStarted)));
    }
}
