//! Types exchanged by the self-registration loop.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};

/// Token endpoint used when a credential document does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service-account credential loaded from a JSON key file.
///
/// The `Debug` implementation redacts the private key so the value can be
/// passed through `tracing` fields safely.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub client_email: String,
    pub client_id: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    pub private_key_id: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl Credentials {
    /// Parse a service-account JSON document. Unknown keys are ignored.
    pub fn from_json(json: &str) -> ParseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Token endpoint for assertion exchange.
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri())
            .finish()
    }
}

/// Short-lived bearer identity assertion.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken {
    pub access_token: String,
    pub expiry: OffsetDateTime,
}

impl IdentityToken {
    pub fn new(access_token: impl Into<String>, expiry: OffsetDateTime) -> Self {
        Self {
            access_token: access_token.into(),
            expiry,
        }
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToken")
            .field("access_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// The host's public address as reported by an echo service.
///
/// Only emptiness is checked on construction; use [`WanAddress::is_ip_literal`]
/// for stricter callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WanAddress(String);

impl WanAddress {
    /// Build an address from an echo response body, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> ParseResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyAddress);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address parses as an IPv4 or IPv6 literal.
    pub fn is_ip_literal(&self) -> bool {
        self.0.parse::<IpAddr>().is_ok()
    }
}

impl fmt::Display for WanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON body POSTed to the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub ip: String,
}

impl From<&WanAddress> for RegistrationRequest {
    fn from(address: &WanAddress) -> Self {
        Self {
            ip: address.as_str().to_string(),
        }
    }
}
