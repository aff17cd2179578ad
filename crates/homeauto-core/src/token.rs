//! Identity token issuance from a service-account credential.
//!
//! Every call builds an RS256 assertion whose `kid` header is the credential's
//! `private_key_id` and whose `iss`/`sub` claims are the service account's
//! email. What happens next depends on [`TokenMode`]:
//!
//! - [`TokenMode::Exchange`]: the assertion is addressed to the credential's
//!   token endpoint with a `target_audience` claim and traded for an ID token
//!   using the JWT bearer grant.
//! - [`TokenMode::SelfSigned`]: the assertion is addressed to the audience
//!   directly and used as the bearer token.
//!
//! Tokens are never cached; each registration attempt gets a new one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use homeauto_types::{Credentials, IdentityToken};

use crate::error::{Error, Result};
use crate::traits::TokenIssuer;

/// Grant type for trading a signed assertion at an OAuth 2.0 token endpoint.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Default assertion validity window.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// How the signed assertion becomes a bearer token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenMode {
    /// Exchange the assertion at the credential's token endpoint for an ID token.
    #[default]
    Exchange,
    /// Use the assertion itself as the bearer token.
    SelfSigned,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_audience: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

/// Sign an RS256 assertion for `aud` with the credential's private key.
///
/// The header's `kid` is always `credentials.private_key_id`.
pub fn sign_assertion(
    credentials: &Credentials,
    aud: &str,
    target_audience: Option<&str>,
    issued_at: OffsetDateTime,
    lifetime: Duration,
) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
        .map_err(|e| Error::Credential(format!("invalid private key: {}", e)))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(credentials.private_key_id.clone());

    let iat = issued_at.unix_timestamp();
    let exp = i64::try_from(lifetime.as_secs())
        .ok()
        .and_then(|secs| iat.checked_add(secs))
        .ok_or_else(|| lifetime_out_of_range(lifetime))?;
    let claims = AssertionClaims {
        iss: &credentials.client_email,
        sub: &credentials.client_email,
        aud,
        iat,
        exp,
        target_audience,
    };

    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| Error::Credential(format!("failed to sign assertion: {}", e)))
}

fn lifetime_out_of_range(lifetime: Duration) -> Error {
    Error::Credential(format!("token lifetime of {}s is out of range", lifetime.as_secs()))
}

/// [`TokenIssuer`] backed by a service-account key.
#[derive(Debug, Clone)]
pub struct ServiceAccountTokenIssuer {
    credentials: Arc<Credentials>,
    mode: TokenMode,
    lifetime: Duration,
    client: Client,
}

impl ServiceAccountTokenIssuer {
    /// Create an issuer. `timeout` bounds the exchange request.
    pub fn new(credentials: Arc<Credentials>, mode: TokenMode, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            mode,
            lifetime: DEFAULT_TOKEN_LIFETIME,
            client,
        })
    }

    /// Override the assertion validity window.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn mode(&self) -> TokenMode {
        self.mode
    }

    async fn exchange(&self, assertion: &str) -> Result<String> {
        let token_uri = self.credentials.token_uri();
        debug!("Exchanging assertion at {}", token_uri);

        let response = self
            .client
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| Error::TokenExchange(format!("request to {} failed: {}", token_uri, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenExchange(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid token response: {}", e)))?;

        body.id_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::TokenExchange("token response did not contain an id_token".into())
        })
    }
}

#[async_trait]
impl TokenIssuer for ServiceAccountTokenIssuer {
    async fn issue(&self, audience: &str) -> Result<IdentityToken> {
        let now = OffsetDateTime::now_utc();
        let expiry = time::Duration::try_from(self.lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or_else(|| lifetime_out_of_range(self.lifetime))?;

        let access_token = match self.mode {
            TokenMode::SelfSigned => {
                sign_assertion(&self.credentials, audience, None, now, self.lifetime)?
            }
            TokenMode::Exchange => {
                let assertion = sign_assertion(
                    &self.credentials,
                    self.credentials.token_uri(),
                    Some(audience),
                    now,
                    self.lifetime,
                )?;
                self.exchange(&assertion).await?
            }
        };

        Ok(IdentityToken::new(access_token, expiry))
    }
}
