//! # Validation Error Types
//!
//! Structured errors for constructing domain primitives from untrusted
//! input. Uses `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Errors from validating domain-primitive input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A hex string had the wrong length for a 32-byte value.
    #[error("expected 64 hex chars, got {0}")]
    InvalidHexLength(usize),

    /// A hex string contained a non-hex character.
    #[error("invalid hex at offset {offset}: {detail}")]
    InvalidHexChar {
        /// Byte offset of the offending character.
        offset: usize,
        /// Parser detail.
        detail: String,
    },
}
