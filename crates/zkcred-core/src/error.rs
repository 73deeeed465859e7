//! # Error Types — Foundational Error Hierarchy
//!
//! Errors for the core primitives. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Field element errors name the offending input and the rule it broke.
//! - Timestamp errors carry the raw string that failed to parse.
//! - Higher layers define their own taxonomies and `#[from]` these where
//!   a core primitive is the cause.

use thiserror::Error;

/// Error constructing a [`crate::FieldElement`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The string is not a plain decimal integer (hex, sign, whitespace,
    /// or non-digit characters).
    #[error("not a canonical decimal integer: {0:?}")]
    NotDecimal(String),

    /// The string has a leading zero (only `"0"` itself may start with 0).
    #[error("leading zeros are not canonical: {0:?}")]
    LeadingZero(String),

    /// The value is not strictly below the BN254 scalar field prime.
    #[error("value does not fit in the scalar field: {0}")]
    ExceedsModulus(String),

    /// A byte-string input is too wide to embed in a single field element.
    #[error("byte input of {got} bytes exceeds the {max}-byte field capacity")]
    BytesTooWide {
        /// Number of bytes supplied.
        got: usize,
        /// Maximum bytes a single element can hold.
        max: usize,
    },
}

/// Error constructing or parsing a [`crate::Timestamp`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The string is not valid RFC 3339 or does not use the Z suffix.
    #[error("invalid UTC timestamp {input:?}: {reason}")]
    Invalid {
        /// The raw input string.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An epoch value outside the representable range.
    #[error("unrepresentable epoch timestamp: {0}")]
    OutOfRange(i64),
}
