//! Transport layer for the balltrack protocol
//!
//! One session type per messaging pattern, all speaking length-prefixed
//! MessagePack frames over TCP:
//!
//! - [`ReplySession`] / [`RequestSession`]: strict turn-taking
//!   request/reply, the control channel
//! - [`PushSession`] / [`PullSession`]: fire-and-forget pipeline, the
//!   camera-feed channel
//! - [`PublishSession`] / [`SubscribeSession`]: topic-filtered fan-out
//!
//! Each type exposes only the operations its pattern supports; sending on
//! a pull session is not a runtime error, it does not compile. The shared
//! lifecycle (start/stop/is_connected) lives on the [`Session`] trait.

pub mod error;
pub mod frame;
pub mod pubsub;
pub mod pull;
pub mod push;
pub mod reply;
pub mod request;

pub use error::{Error, Result};
pub use pubsub::{PublishSession, SubscribeSession};
pub use pull::PullSession;
pub use push::PushSession;
pub use reply::ReplySession;
pub use request::RequestSession;

use async_trait::async_trait;

/// Default timeout for connecting patterns
pub const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Messaging pattern of a session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pattern {
    Reply,
    Request,
    Push,
    Pull,
    Publish,
    Subscribe,
}

impl Pattern {
    /// Check if this pattern owns its address (binds rather than connects)
    pub fn binds(self) -> bool {
        matches!(self, Self::Reply | Self::Push | Self::Publish)
    }
}

/// Shared session lifecycle
///
/// A session is created unbound with a fixed port, started against a host
/// (bind or connect depending on the pattern), used, and stopped. `start`
/// on a started session and `stop` on a stopped one are no-ops. A session
/// exclusively owns its socket handle.
#[async_trait]
pub trait Session: Send {
    /// The session's messaging pattern
    fn pattern(&self) -> Pattern;

    /// The port fixed at construction
    fn port(&self) -> u16;

    /// Check if an underlying socket handle is live
    fn is_connected(&self) -> bool;

    /// Bind or connect the underlying socket; idempotent
    async fn start(&mut self, host: &str) -> Result<()>;

    /// Release the underlying socket; idempotent
    async fn stop(&mut self) -> Result<()>;
}
