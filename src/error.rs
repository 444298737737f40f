//! Error types for the Tight encoder.

use std::io;
use thiserror::Error;

/// Result type for Tight encoding operations.
pub type Result<T> = std::result::Result<T, TightError>;

/// Errors that can occur while encoding a rectangle.
///
/// Running out of palette space is not an error: the encoder falls back to
/// full-color or JPEG output. Everything listed here is fatal for the
/// rectangle being encoded and is returned to the caller unmodified.
#[derive(Debug, Error)]
pub enum TightError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persistent zlib stream rejected the data.
    #[error("Compression error: {0}")]
    Compression(#[from] flate2::CompressError),

    /// The JPEG back end failed.
    #[error("JPEG error: {0}")]
    Jpeg(String),

    /// The client pixel format cannot be encoded with Tight.
    #[error("Invalid pixel format")]
    InvalidPixelFormat,

    /// The rectangle cannot be encoded (for example, it has no area).
    #[error("Invalid rectangle: {0}")]
    InvalidRectangle(String),

    /// The encoder's input broke an invariant it relies on.
    #[error("Encoding error: {0}")]
    Encoding(String),
}
