//! REST API endpoints for homeauto-api.
//!
//! # Endpoints
//!
//! - `GET /api/environment` - latest temperature for every configured slot,
//!   keyed `<slot>Temp`. `HEAD` answers 200 without querying the store.
//! - `GET /api/health` - liveness check.
//!
//! ## Error Handling
//!
//! Aggregation failures of any kind (store unreachable, undecodable response,
//! a slot missing from the window) become `503 Service Unavailable` with a
//! fixed JSON body. The cause is logged, not returned.
//!
//! # Example
//!
//! ```ignore
//! use homeauto_api::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use homeauto_types::AggregatedEnvironment;

use crate::state::AppState;

/// Body returned for any failed environment request.
pub const UNAVAILABLE_MESSAGE: &str = "environment data unavailable";

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // `get` also routes HEAD requests
        .route("/api/environment", get(environment))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Environment snapshot as served to clients: `{"poolTemp": 12.0, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EnvironmentResponse(BTreeMap<String, f64>);

impl EnvironmentResponse {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }
}

impl From<&AggregatedEnvironment> for EnvironmentResponse {
    fn from(env: &AggregatedEnvironment) -> Self {
        Self(
            env.iter()
                .map(|(slot, temperature)| (format!("{}Temp", slot), temperature))
                .collect(),
        )
    }
}

/// HEAD is a reachability check and answers 200 without querying the store.
async fn environment(
    method: Method,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    if method == Method::HEAD {
        return Ok(StatusCode::OK.into_response());
    }

    let env = state.aggregator.aggregate().await?;
    Ok(Json(EnvironmentResponse::from(&env)).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    Unavailable(homeauto_core::Error),
}

impl From<homeauto_core::Error> for AppError {
    fn from(e: homeauto_core::Error) -> Self {
        AppError::Unavailable(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let AppError::Unavailable(e) = self;
        warn!("Environment request failed: {}", e);

        let body = serde_json::json!({
            "error": UNAVAILABLE_MESSAGE,
        });

        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
