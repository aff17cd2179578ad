//! Error types for data parsing in homeauto-types.

use thiserror::Error;

/// Errors that can occur when building homeauto data types from raw input.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A probe identifier was empty.
    #[error("Probe id cannot be empty")]
    EmptyProbeId,

    /// A slot name was empty or contained characters outside `[A-Za-z0-9_]`.
    #[error("Invalid probe slot '{0}': expected a non-empty name of letters, digits or '_'")]
    InvalidSlot(String),

    /// An address echo response was empty.
    #[error("WAN address cannot be empty")]
    EmptyAddress,

    /// A service-account credential document could not be parsed.
    #[error("Invalid credentials document: {0}")]
    Credentials(#[from] serde_json::Error),
}

/// Result type alias using homeauto-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
