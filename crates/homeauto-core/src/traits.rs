//! Trait seams between the orchestrators and their outbound calls.
//!
//! [`Registrar`](crate::Registrar) and [`ProbeAggregator`](crate::ProbeAggregator)
//! only talk to the outside world through these traits, so each one can be
//! replaced by a fake from [`crate::mock`] in tests.

use async_trait::async_trait;

use homeauto_types::{IdentityToken, RawReading, WanAddress};

use crate::error::Result;

/// Turns a service-account credential into a bearer token for an audience.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue a fresh token. Implementations must not cache across calls.
    ///
    /// Fails with [`Error::Credential`](crate::Error::Credential) or
    /// [`Error::TokenExchange`](crate::Error::TokenExchange).
    async fn issue(&self, audience: &str) -> Result<IdentityToken>;
}

/// Discovers the host's public address.
#[async_trait]
pub trait IpDiscoverer: Send + Sync {
    /// Fails with [`Error::Network`](crate::Error::Network).
    async fn discover(&self) -> Result<WanAddress>;
}

/// Sends an authenticated address notification to a registration endpoint.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    /// Succeeds only when the endpoint answers 200; the body is ignored.
    ///
    /// Fails with [`Error::Transport`](crate::Error::Transport) or
    /// [`Error::Rejected`](crate::Error::Rejected).
    async fn notify(&self, endpoint: &str, token: &IdentityToken, address: &WanAddress)
    -> Result<()>;
}

/// Source of recent probe readings.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Fetch up to `limit` of the most recent readings across all probes,
    /// newest first.
    ///
    /// Fails with [`Error::Query`](crate::Error::Query) or
    /// [`Error::Decode`](crate::Error::Decode).
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawReading>>;
}
