//! Error types for balltrack-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Message failed to serialize
    #[error("Failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Malformed or truncated frame payload
    #[error("Malformed frame: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Well-formed message carrying a command tag outside the vocabulary
    #[error("Unknown command tag: {0}")]
    UnknownCommand(String),
}

impl Error {
    /// Check if the frame was well-formed but named a command we do not serve
    ///
    /// The dispatcher answers these with a failed status response instead of
    /// dropping the frame.
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Self::UnknownCommand(_))
    }
}
