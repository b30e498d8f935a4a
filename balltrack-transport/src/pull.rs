//! Pull session: the consuming half of the camera-feed channel

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;

use balltrack_core::codec;

use crate::error::{Error, Result};
use crate::frame::{self, FramedStream};
use crate::{DEFAULT_CONNECT_TIMEOUT, Pattern, Session};

/// Consumer endpoint of a push/pull pair
pub struct PullSession {
    port: u16,
    connect_timeout: Duration,
    peer: Option<FramedStream>,
}

impl PullSession {
    /// Create an unconnected pull session for the given port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            peer: None,
        }
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn recv_at<T: DeserializeOwned>(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<T>> {
        loop {
            let peer = self.peer.as_mut().ok_or(Error::NotStarted)?;
            match peer.recv_frame(deadline).await {
                Ok(Some(frame)) => match codec::decode(&frame)? {
                    Some(msg) => return Ok(Some(msg)),
                    // Zero messages in the frame; keep waiting
                    None => continue,
                },
                Ok(None) => return Ok(None),
                Err(e) => {
                    if e.is_disconnect() {
                        debug!("Feed producer lost: {e}");
                        self.peer = None;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Receive one message, blocking until it arrives
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        match self.recv_at(None).await? {
            Some(msg) => Ok(msg),
            // recv_at without a deadline only returns on a message or error
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Receive one message, waiting at most `wait`
    ///
    /// `Ok(None)` is the no-message sentinel.
    pub async fn recv_timeout<T: DeserializeOwned>(&mut self, wait: Duration) -> Result<Option<T>> {
        self.recv_at(Some(Instant::now() + wait)).await
    }

    /// Receive one message without waiting
    pub async fn try_recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        self.recv_timeout(Duration::ZERO).await
    }
}

#[async_trait]
impl Session for PullSession {
    fn pattern(&self) -> Pattern {
        Pattern::Pull
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
        debug!("Pull session connected to {host}:{}", self.port);
        self.peer = Some(FramedStream::new(stream));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut peer) = self.peer.take() {
            peer.shutdown().await;
        }
        Ok(())
    }
}
