//! WAN address discovery through a public echo service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use homeauto_types::WanAddress;

use crate::error::{Error, Result};
use crate::traits::IpDiscoverer;

/// Default echo service; answers with the caller's address as plain text.
pub const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";

/// [`IpDiscoverer`] that GETs a plain-text echo service.
///
/// The response body is used verbatim apart from trimming whitespace. With
/// [`strict`](Self::strict) enabled, bodies that are not IPv4/IPv6 literals
/// are rejected instead of being forwarded.
#[derive(Debug, Clone)]
pub struct EchoIpDiscoverer {
    client: Client,
    url: String,
    strict: bool,
}

impl EchoIpDiscoverer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            strict: false,
        })
    }

    /// Reject echo responses that do not parse as an IP literal.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpDiscoverer for EchoIpDiscoverer {
    async fn discover(&self) -> Result<WanAddress> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "{} returned status {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {}", e)))?;
        debug!("Echo service answered {:?}", body);

        let address = WanAddress::new(&body)
            .map_err(|_| Error::Network(format!("{} returned an empty body", self.url)))?;

        if self.strict && !address.is_ip_literal() {
            return Err(Error::Network(format!(
                "{} returned '{}', which is not an IP address",
                self.url, address
            )));
        }

        Ok(address)
    }
}
