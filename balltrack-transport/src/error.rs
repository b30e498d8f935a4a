//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Session is not started")]
    NotStarted,

    #[error("Connection failed: {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("Connection timeout: {addr}")]
    ConnectTimeout { addr: String },

    #[error("Address already in use: {addr}")]
    AddressInUse { addr: String },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// Wrong operation order for the session's pattern, e.g. two receives
    /// on a reply session without a reply in between
    #[error("Protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error(transparent)]
    Codec(#[from] balltrack_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Check if this error ends the current peer connection
    ///
    /// The owning session drops the peer and waits for a fresh one; binding
    /// sessions keep their listener either way.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::Io(_) | Self::FrameTooLarge { .. }
        )
    }
}
