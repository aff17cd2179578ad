//! Self-registration of the host's WAN address.
//!
//! One attempt issues an identity token and discovers the WAN address
//! concurrently, then notifies the registration endpoint with both. Any
//! failure ends that attempt; the next tick of [`Registrar::run`] is the
//! only retry. There is no backoff, no retry budget and no suppression of
//! unchanged addresses: every tick sends the same request shape.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use homeauto_types::WanAddress;

use crate::error::{Error, Result};
use crate::traits::{IpDiscoverer, RegistrationClient, TokenIssuer};

/// Default interval between registration attempts.
pub const DEFAULT_REGISTER_INTERVAL: Duration = Duration::from_secs(300);

/// Where and how often to register.
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Registration endpoint URL.
    pub endpoint: String,
    /// Audience the identity token is issued for.
    pub audience: String,
    /// Time between attempts.
    pub interval: Duration,
}

impl RegistrarConfig {
    pub fn new(endpoint: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            audience: audience.into(),
            interval: DEFAULT_REGISTER_INTERVAL,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Orchestrates registration attempts.
///
/// All collaborators are injected, so tests can substitute the fakes from
/// [`crate::mock`].
pub struct Registrar {
    issuer: Arc<dyn TokenIssuer>,
    discoverer: Arc<dyn IpDiscoverer>,
    client: Arc<dyn RegistrationClient>,
    config: RegistrarConfig,
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Registrar {
    pub fn new(
        issuer: Arc<dyn TokenIssuer>,
        discoverer: Arc<dyn IpDiscoverer>,
        client: Arc<dyn RegistrationClient>,
        config: RegistrarConfig,
    ) -> Self {
        Self {
            issuer,
            discoverer,
            client,
            config,
        }
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// Perform one registration attempt and return the address that was registered.
    ///
    /// The notification is only sent when both the token and the address
    /// were obtained.
    pub async fn register_once(&self) -> Result<WanAddress> {
        let (token, address) = tokio::join!(
            self.issuer.issue(&self.config.audience),
            self.discoverer.discover(),
        );

        let token = token.inspect_err(|e| warn!("Failed to create identity token: {}", e))?;
        let address = address.inspect_err(|e| warn!("Failed to get WAN IP: {}", e))?;
        info!("Discovered WAN IP: {}", address);

        self.client
            .notify(&self.config.endpoint, &token, &address)
            .await
            .inspect_err(|e| match e {
                Error::Rejected { status } => {
                    warn!("Registration endpoint failed with response code {}", status)
                }
                e => warn!("Failed to call registration endpoint: {}", e),
            })?;

        info!("Registered WAN IP {} with {}", address, self.config.endpoint);
        Ok(address)
    }

    /// Register immediately, then once per interval until `cancel` fires.
    ///
    /// Attempts never overlap: a slow attempt delays the next tick rather
    /// than queueing extra ones. Errors are logged by
    /// [`register_once`](Self::register_once) and otherwise dropped.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Starting registration loop for {} (interval: {}s)",
            self.config.endpoint,
            self.config.interval.as_secs()
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.register_once() => {}
            }
        }

        info!("Registration loop stopped");
    }

    /// Spawn [`run`](Self::run) onto the current runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
