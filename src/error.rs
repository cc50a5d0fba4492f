use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the engine core.
///
/// Construction-time contract violations (non-positive cutoff, inverted
/// domain bounds, zero substep counts) surface here so that no ill-configured
/// component ever reaches the tick loop. The tick loop itself is infallible:
/// degenerate runtime geometry is absorbed by documented defaults instead of
/// being reported.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid constructor or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Propagated I/O errors from the frame writers.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
