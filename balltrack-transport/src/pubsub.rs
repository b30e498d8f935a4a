//! Publish/subscribe sessions
//!
//! The publisher binds and fans every message out to all connected
//! subscribers, each frame prefixed with its topic. Subscribers connect,
//! register topics, and drop any frame whose topic they did not ask for.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::{debug, trace};

use balltrack_core::codec;

use crate::error::{Error, Result};
use crate::frame::{self, FramedStream};
use crate::{DEFAULT_CONNECT_TIMEOUT, Pattern, Session};

/// Fan-out endpoint of a publish/subscribe group
pub struct PublishSession {
    port: u16,
    listener: Option<TcpListener>,
    subscribers: Vec<FramedStream>,
}

impl PublishSession {
    /// Create an unbound publish session on the given port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            listener: None,
            subscribers: Vec::new(),
        }
    }

    /// Number of currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Publish one message under `topic` to every connected subscriber
    ///
    /// Dead subscribers are pruned as the write to them fails; delivery is
    /// best-effort fan-out, never an error for the publisher.
    pub async fn send<T: Serialize>(&mut self, topic: &str, msg: &T) -> Result<()> {
        let listener = self.listener.as_ref().ok_or(Error::NotStarted)?;

        // Adopt every subscriber that connected since the last publish
        while let Some((stream, addr)) = frame::try_accept(listener).await? {
            debug!("Accepted subscriber {addr}");
            stream.set_nodelay(true)?;
            self.subscribers.push(FramedStream::new(stream));
        }

        let payload = codec::encode(msg).map_err(Error::Codec)?;
        let framed = frame::encode_topic_payload(topic, &payload)?;

        let mut alive = Vec::with_capacity(self.subscribers.len());
        for mut subscriber in self.subscribers.drain(..) {
            match subscriber.send_frame(&framed).await {
                Ok(()) => alive.push(subscriber),
                Err(e) => debug!("Subscriber lost: {e}"),
            }
        }
        self.subscribers = alive;

        trace!(
            "Published {} bytes on '{topic}' to {} subscribers",
            framed.len(),
            self.subscribers.len()
        );
        Ok(())
    }
}

#[async_trait]
impl Session for PublishSession {
    fn pattern(&self) -> Pattern {
        Pattern::Publish
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
        debug!("Publish session bound on {host}:{}", self.port);
        self.listener = Some(listener);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        for mut subscriber in self.subscribers.drain(..) {
            subscriber.shutdown().await;
        }
        self.listener = None;
        Ok(())
    }
}

/// Filtering endpoint of a publish/subscribe group
pub struct SubscribeSession {
    port: u16,
    topics: Vec<String>,
    connect_timeout: Duration,
    peer: Option<FramedStream>,
}

impl SubscribeSession {
    /// Create an unconnected subscribe session for the given topics
    pub fn new(port: u16, topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            port,
            topics: topics.into_iter().map(Into::into).collect(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            peer: None,
        }
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Register one more topic to receive
    pub fn subscribe(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        if !self.topics.contains(&topic) {
            self.topics.push(topic);
        }
    }

    async fn recv_at<T: DeserializeOwned>(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<(String, T)>> {
        loop {
            let peer = self.peer.as_mut().ok_or(Error::NotStarted)?;
            match peer.recv_frame(deadline).await {
                Ok(Some(raw)) => {
                    let (topic, payload) = frame::split_topic_payload(&raw)?;
                    if !self.topics.contains(&topic) {
                        trace!("Dropping frame for unsubscribed topic '{topic}'");
                        continue;
                    }
                    match codec::decode(&payload)? {
                        Some(msg) => return Ok(Some((topic, msg))),
                        None => continue,
                    }
                }
                Ok(None) => return Ok(None),
                Err(e) => {
                    if e.is_disconnect() {
                        debug!("Publisher lost: {e}");
                        self.peer = None;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Receive the next message on a subscribed topic, blocking
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<(String, T)> {
        match self.recv_at(None).await? {
            Some(msg) => Ok(msg),
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Receive the next message on a subscribed topic, waiting at most `wait`
    pub async fn recv_timeout<T: DeserializeOwned>(
        &mut self,
        wait: Duration,
    ) -> Result<Option<(String, T)>> {
        self.recv_at(Some(Instant::now() + wait)).await
    }
}

#[async_trait]
impl Session for SubscribeSession {
    fn pattern(&self) -> Pattern {
        Pattern::Subscribe
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
        debug!(
            "Subscribe session connected to {host}:{} for topics {:?}",
            self.port, self.topics
        );
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_fine() {
        let mut session = PublishSession::new(5741);
        session.start("127.0.0.1").await.unwrap();

        session.send("camera.feed", &"frame").await.unwrap();
        assert_eq!(session.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_deduplicates_topics() {
        let mut session = SubscribeSession::new(5742, ["camera.feed"]);
        session.subscribe("camera.feed");
        session.subscribe("telemetry");
        assert_eq!(session.topics.len(), 2);
    }

    #[tokio::test]
    async fn test_publish_before_start_fails() {
        let mut session = PublishSession::new(5743);
        let result = session.send("topic", &"msg").await;
        assert!(matches!(result, Err(Error::NotStarted)));
    }
}
