//! # Error Types
//!
//! This module defines error types used throughout the kp347 driver.
//!
//! Most printer operations are fire-and-forget byte emissions: out-of-range
//! parameters are clamped rather than rejected. Errors only surface from the
//! port itself, from malformed bitmap input, and from configuration loading.

use thiserror::Error;

/// Main error type for kp347 operations
#[derive(Debug, Error)]
pub enum PrinterError {
    /// Transport-level errors (open, configure, read, write)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A preloaded bitmap buffer holds fewer bytes than its dimensions need
    #[error("Bitmap buffer too short: expected {expected} bytes, got {actual}")]
    BitmapTooShort { expected: usize, actual: usize },

    /// A bitmap stream ended before the declared number of bytes arrived
    #[error("Bitmap stream closed with {remaining} bytes still expected")]
    StreamClosed { remaining: usize },

    /// Configuration could not be parsed or holds an unsupported value
    #[error("Config error: {0}")]
    Config(String),

    /// Image decoding error (CLI bitmap printing)
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kp347 operations.
pub type Result<T> = std::result::Result<T, PrinterError>;
