//! Error types for wavefield

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WavefieldError {
    /// Input arrays of the wrong shape, non-finite values or a virtual
    /// source sitting on top of a loudspeaker.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Two index-aligned sequences disagree in length.
    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A designed filter section has a pole on or outside the unit circle.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

pub type Result<T> = std::result::Result<T, WavefieldError>;

/// Fails with [`WavefieldError::LengthMismatch`] unless `got == expected`.
pub(crate) fn ensure_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(WavefieldError::LengthMismatch { expected, got });
    }
    Ok(())
}
