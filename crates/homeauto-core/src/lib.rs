//! Self-registration and probe aggregation for the homeauto sidecar.
//!
//! This crate holds the two subsystems with real logic in them:
//!
//! - **Self-registration**: a [`Registrar`] that, on a fixed interval, issues
//!   an identity token ([`ServiceAccountTokenIssuer`]), discovers the host's
//!   WAN address ([`EchoIpDiscoverer`]) and notifies a remote endpoint
//!   ([`HttpRegistrationClient`]). A failed attempt is logged and retried on
//!   the next tick.
//! - **Probe aggregation**: a [`ProbeAggregator`] that fetches the newest
//!   readings from a search backend ([`SearchReadingStore`]) and resolves one
//!   temperature per configured slot, failing as a whole if any slot is
//!   missing from the window.
//!
//! Every outbound call sits behind a trait in [`traits`], and [`mock`]
//! provides in-memory fakes for each of them.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use homeauto_core::{
//!     EchoIpDiscoverer, HttpRegistrationClient, Registrar, RegistrarConfig,
//!     ServiceAccountTokenIssuer, TokenMode, load_credentials,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let timeout = Duration::from_secs(10);
//!     let credentials = Arc::new(load_credentials("/etc/homeauto-api/credentials.json")?);
//!
//!     let registrar = Arc::new(Registrar::new(
//!         Arc::new(ServiceAccountTokenIssuer::new(credentials, TokenMode::Exchange, timeout)?),
//!         Arc::new(EchoIpDiscoverer::new("https://api.ipify.org", timeout)?),
//!         Arc::new(HttpRegistrationClient::new(timeout)?),
//!         RegistrarConfig::new("https://example.com/register", "client-id")
//!             .interval(Duration::from_secs(300)),
//!     ));
//!
//!     let cancel = CancellationToken::new();
//!     registrar.spawn(cancel.clone());
//!     // ...
//!     cancel.cancel();
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod credentials;
pub mod error;
pub mod mock;
pub mod notify;
pub mod readings;
pub mod registrar;
pub mod token;
pub mod traits;
pub mod wan;

#[cfg(test)]
mod test_support;

pub use aggregate::{DEFAULT_WINDOW, ProbeAggregator};
pub use credentials::{DEFAULT_CREDENTIALS_PATH, load_credentials};
pub use error::{Error, Result};
pub use mock::{MockIpDiscoverer, MockReadingStore, MockRegistrationClient, MockTokenIssuer};
pub use notify::HttpRegistrationClient;
pub use readings::{DEFAULT_SEARCH_URL, DEFAULT_TIMESTAMP_FIELD, SearchReadingStore};
pub use registrar::{DEFAULT_REGISTER_INTERVAL, Registrar, RegistrarConfig};
pub use token::{DEFAULT_TOKEN_LIFETIME, ServiceAccountTokenIssuer, TokenMode, sign_assertion};
pub use traits::{IpDiscoverer, ReadingStore, RegistrationClient, TokenIssuer};
pub use wan::{DEFAULT_IP_ECHO_URL, EchoIpDiscoverer};

// Re-export types for convenience
pub use homeauto_types as types;
