//! Authenticated address notification to the registration endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use homeauto_types::{IdentityToken, RegistrationRequest, WanAddress};

use crate::error::{Error, Result};
use crate::traits::RegistrationClient;

/// [`RegistrationClient`] that POSTs `{"ip": ...}` with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpRegistrationClient {
    client: Client,
}

impl HttpRegistrationClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RegistrationClient for HttpRegistrationClient {
    async fn notify(
        &self,
        endpoint: &str,
        token: &IdentityToken,
        address: &WanAddress,
    ) -> Result<()> {
        // `json` sets Content-Type: application/json.
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&token.access_token)
            .json(&RegistrationRequest::from(address))
            .send()
            .await
            .map_err(Error::Transport)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(Error::Rejected {
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
    };
    use time::OffsetDateTime;

    use super::*;
    use crate::test_support::serve;

    #[derive(Debug, Clone)]
    struct Captured {
        authorization: Option<String>,
        content_type: Option<String>,
        body: RegistrationRequest,
    }

    async fn endpoint(status: AxumStatus) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let seen: Arc<Mutex<Vec<Captured>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/register",
            post(move |headers: HeaderMap, Json(body): Json<RegistrationRequest>| {
                let captured = Arc::clone(&captured);
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    captured.lock().unwrap().push(Captured {
                        authorization: header("authorization"),
                        content_type: header("content-type"),
                        body,
                    });
                    (status, "ignored body")
                }
            }),
        );
        let base = serve(router).await;
        (format!("{}/register", base), seen)
    }

    fn token() -> IdentityToken {
        IdentityToken::new("id-token-value", OffsetDateTime::now_utc())
    }

    #[tokio::test]
    async fn test_notify_sends_bearer_json() {
        let (url, seen) = endpoint(AxumStatus::OK).await;
        let client = HttpRegistrationClient::new(Duration::from_secs(5)).unwrap();
        let address = WanAddress::new("203.0.113.7").unwrap();

        client.notify(&url, &token(), &address).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer id-token-value"));
        assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(seen[0].body.ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_notify_rejected_status() {
        let (url, _) = endpoint(AxumStatus::INTERNAL_SERVER_ERROR).await;
        let client = HttpRegistrationClient::new(Duration::from_secs(5)).unwrap();
        let address = WanAddress::new("203.0.113.7").unwrap();

        let err = client.notify(&url, &token(), &address).await.unwrap_err();

        assert!(matches!(err, Error::Rejected { status: 500 }));
    }

    #[tokio::test]
    async fn test_notify_only_200_is_success() {
        let (url, _) = endpoint(AxumStatus::NO_CONTENT).await;
        let client = HttpRegistrationClient::new(Duration::from_secs(5)).unwrap();
        let address = WanAddress::new("203.0.113.7").unwrap();

        let err = client.notify(&url, &token(), &address).await.unwrap_err();

        assert!(matches!(err, Error::Rejected { status: 204 }));
    }

    #[tokio::test]
    async fn test_notify_transport_error() {
        let client = HttpRegistrationClient::new(Duration::from_secs(5)).unwrap();
        let address = WanAddress::new("203.0.113.7").unwrap();

        let err = client
            .notify("http://127.0.0.1:9/register", &token(), &address)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }
}
