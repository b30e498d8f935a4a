pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Frame data of {actual} bytes does not match a {width}x{height} capture ({expected} bytes)"
    )]
    InvalidFrameSize {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}
