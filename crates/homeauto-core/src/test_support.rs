//! Helpers shared by unit tests that exercise the HTTP clients.

use std::sync::Arc;

use axum::Router;
use homeauto_types::Credentials;

pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("../tests/fixtures/service_account_key.pem");
pub(crate) const TEST_PUBLIC_KEY: &str =
    include_str!("../tests/fixtures/service_account_key.pub.pem");

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub(crate) fn test_credentials(token_uri: Option<String>) -> Arc<Credentials> {
    Arc::new(Credentials {
        client_email: "registrar@homeauto.iam.gserviceaccount.com".to_string(),
        client_id: "1234567890".to_string(),
        private_key: TEST_PRIVATE_KEY.to_string(),
        private_key_id: "3f1c0e5a9b7d".to_string(),
        token_uri,
    })
}
