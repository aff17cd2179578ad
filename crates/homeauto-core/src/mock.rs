//! In-memory fakes for every outbound seam.
//!
//! These implement the traits in [`crate::traits`] so the [`Registrar`] and
//! [`ProbeAggregator`] can be exercised without network access.
//!
//! # Features
//!
//! - **Failure injection**: make any fake fail with its seam's error variant
//! - **Call recording**: inspect what the orchestrator sent
//! - **Latency simulation**: delay the registration client to test tick behaviour
//!
//! [`Registrar`]: crate::Registrar
//! [`ProbeAggregator`]: crate::ProbeAggregator

use std::sync::Mutex;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use homeauto_types::{IdentityToken, RawReading, RegistrationRequest, WanAddress};

use crate::error::{Error, Result};
use crate::traits::{IpDiscoverer, ReadingStore, RegistrationClient, TokenIssuer};

/// Fake [`TokenIssuer`] returning `mock-token-<n>`.
#[derive(Debug, Default)]
pub struct MockTokenIssuer {
    failure: Mutex<Option<String>>,
    audiences: Mutex<Vec<String>>,
    issued: AtomicU32,
}

impl MockTokenIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail subsequent calls with [`Error::Credential`], or succeed again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    /// Number of `issue` calls, including failed ones.
    pub fn issue_count(&self) -> u32 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Audiences requested so far.
    pub fn audiences(&self) -> Vec<String> {
        self.audiences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TokenIssuer for MockTokenIssuer {
    async fn issue(&self, audience: &str) -> Result<IdentityToken> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.audiences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(audience.to_string());

        if let Some(message) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(Error::Credential(message));
        }

        Ok(IdentityToken::new(
            format!("mock-token-{}", n),
            OffsetDateTime::now_utc() + Duration::from_secs(3600),
        ))
    }
}

/// Fake [`IpDiscoverer`] returning a fixed address.
#[derive(Debug)]
pub struct MockIpDiscoverer {
    address: Mutex<String>,
    failure: Mutex<Option<String>>,
    calls: AtomicU32,
}

impl MockIpDiscoverer {
    pub fn new(address: &str) -> Self {
        Self {
            address: Mutex::new(address.to_string()),
            failure: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_address(&self, address: &str) {
        *self.address.lock().unwrap_or_else(|e| e.into_inner()) = address.to_string();
    }

    /// Fail subsequent calls with [`Error::Network`], or succeed again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpDiscoverer for MockIpDiscoverer {
    async fn discover(&self) -> Result<WanAddress> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(Error::Network(message));
        }

        let address = self.address.lock().unwrap_or_else(|e| e.into_inner()).clone();
        WanAddress::new(address).map_err(|e| Error::Network(e.to_string()))
    }
}

/// A notification received by [`MockRegistrationClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNotification {
    pub endpoint: String,
    pub bearer: String,
    pub body: RegistrationRequest,
}

/// Fake [`RegistrationClient`] answering with a configurable status.
///
/// Notifications are recorded once the simulated latency has elapsed, whatever
/// the status.
#[derive(Debug)]
pub struct MockRegistrationClient {
    status: AtomicU16,
    latency: Mutex<Duration>,
    calls: Mutex<Vec<RecordedNotification>>,
}

impl Default for MockRegistrationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegistrationClient {
    pub fn new() -> Self {
        Self {
            status: AtomicU16::new(200),
            latency: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Status returned by subsequent calls; anything but 200 is a rejection.
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn calls(&self) -> Vec<RecordedNotification> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl RegistrationClient for MockRegistrationClient {
    async fn notify(
        &self,
        endpoint: &str,
        token: &IdentityToken,
        address: &WanAddress,
    ) -> Result<()> {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedNotification {
                endpoint: endpoint.to_string(),
                bearer: token.bearer(),
                body: RegistrationRequest::from(address),
            });

        match self.status.load(Ordering::SeqCst) {
            200 => Ok(()),
            status => Err(Error::Rejected { status }),
        }
    }
}

/// Fake [`ReadingStore`] serving a fixed newest-first window.
#[derive(Debug, Default)]
pub struct MockReadingStore {
    readings: Mutex<Vec<RawReading>>,
    failure: Mutex<Option<String>>,
    limits: Mutex<Vec<usize>>,
}

impl MockReadingStore {
    pub fn new(readings: Vec<RawReading>) -> Self {
        Self {
            readings: Mutex::new(readings),
            ..Default::default()
        }
    }

    pub fn set_readings(&self, readings: Vec<RawReading>) {
        *self.readings.lock().unwrap_or_else(|e| e.into_inner()) = readings;
    }

    /// Fail subsequent calls with [`Error::Query`], or succeed again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    /// The `limit` argument of every fetch so far.
    pub fn requested_limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ReadingStore for MockReadingStore {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawReading>> {
        self.limits
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(limit);

        if let Some(message) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(Error::Query(message));
        }

        let readings = self.readings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(readings.iter().take(limit).cloned().collect())
    }
}
