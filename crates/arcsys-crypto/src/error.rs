//! Error types for the cipher crate.

use thiserror::Error;

/// Errors that can occur when configuring a cipher.
#[derive(Debug, Error)]
pub enum Error {
    /// A key table given as text was not valid hex.
    #[error("invalid hex key: {0}")]
    InvalidKey(String),

    /// A key table with no bytes cannot drive the XOR stream.
    #[error("key table is empty")]
    EmptyKey,
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, Error>;
