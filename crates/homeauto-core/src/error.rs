//! Error types for homeauto-core.
//!
//! # Propagation
//!
//! | Error | Raised by | Effect |
//! |-------|-----------|--------|
//! | [`Error::Credential`] | token issuance | registration attempt aborted for this tick |
//! | [`Error::TokenExchange`] | token issuance | registration attempt aborted for this tick |
//! | [`Error::Network`] | address discovery | registration attempt aborted for this tick |
//! | [`Error::Transport`] | registration notify | logged, retried next tick |
//! | [`Error::Rejected`] | registration notify | logged, retried next tick |
//! | [`Error::Query`] | reading store | aggregation fails, caller sees 503 |
//! | [`Error::Decode`] | reading store | aggregation fails, caller sees 503 |
//! | [`Error::IncompleteData`] | aggregation | aggregation fails, caller sees 503 |
//! | [`Error::InvalidConfig`] | constructors | start-up fails |
//!
//! Nothing in this crate retries internally. The registration loop's next
//! tick and the next HTTP request are the only retry paths.

use homeauto_types::ProbeSlot;
use thiserror::Error;

/// Errors raised by the registration and aggregation subsystems.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The private key could not be parsed or the assertion could not be signed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The assertion could not be exchanged for an identity token.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The address echo service could not be reached or answered badly.
    #[error("Network error: {0}")]
    Network(String),

    /// The registration request could not be sent.
    #[error("Failed to send registration: {0}")]
    Transport(#[source] reqwest::Error),

    /// The registration endpoint answered with a status other than 200.
    #[error("Registration rejected with status {status}")]
    Rejected {
        /// HTTP status code returned by the endpoint.
        status: u16,
    },

    /// The reading store could not be queried.
    #[error("Reading store query failed: {0}")]
    Query(String),

    /// The reading store answered with a body that does not match the expected shape.
    #[error("Failed to decode reading store response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The aggregation window did not contain a reading for every required slot.
    #[error("Incomplete data: no reading for slot(s) {}", format_slots(.missing))]
    IncompleteData {
        /// Slots that stayed empty.
        missing: Vec<ProbeSlot>,
    },

    /// A component was constructed with unusable settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn format_slots(slots: &[ProbeSlot]) -> String {
    slots
        .iter()
        .map(ProbeSlot::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<homeauto_types::MissingSlots> for Error {
    fn from(missing: homeauto_types::MissingSlots) -> Self {
        Error::IncompleteData { missing: missing.0 }
    }
}

/// Result type alias using homeauto-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
