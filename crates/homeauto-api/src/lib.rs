//! Home network sidecar: self-registration loop and probe temperature API.
//!
//! This crate provides a service that:
//! - Periodically registers the host's WAN address with a remote endpoint,
//!   authenticated by a service-account identity token
//! - Serves the latest pool, shade and sun temperatures (or whatever slots
//!   are configured) aggregated from a search backend
//!
//! # REST API Endpoints
//!
//! - `GET /api/environment` - latest temperature per slot, `503` when any slot
//!   has no reading in the window
//! - `GET /api/health` - service health check
//!
//! # Configuration
//!
//! The service reads configuration from `/etc/homeauto-api/config.yaml`:
//!
//! ```yaml
//! port: 8080
//! registerFunction: https://europe-west1-homeauto.cloudfunctions.net/register
//! clientId: 1234567890.apps.googleusercontent.com
//!
//! registration:
//!   intervalSecs: 300
//!   credentialsPath: /etc/homeauto-api/credentials.json
//!
//! readings:
//!   searchUrl: http://elasticsearch-master:9200/logstash-*/_search
//!   window: 10
//!
//! probes:
//!   28-0316a2799dff: pool
//!   28-0316a27bb7ff: shade
//!   28-0516a46bc2ff: sun
//! ```

pub mod api;
pub mod config;
pub mod registration;
pub mod state;

pub use config::{
    Config, ConfigError, ConfigFormat, ReadingsConfig, RegistrationConfig, ServerConfig,
    ValidationError, default_config_path,
};
pub use registration::Registration;
pub use state::AppState;
