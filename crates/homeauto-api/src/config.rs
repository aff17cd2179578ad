//! Service configuration.
//!
//! The file format is chosen from the extension: `.yaml`/`.yml` is YAML,
//! `.json` is JSON and anything else is TOML. Keys are camelCase in every
//! format.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use homeauto_core::{
    DEFAULT_CREDENTIALS_PATH, DEFAULT_IP_ECHO_URL, DEFAULT_SEARCH_URL, DEFAULT_TIMESTAMP_FIELD,
    DEFAULT_WINDOW, TokenMode,
};
use homeauto_types::{ProbeId, ProbeSlot, ProbeSlotMap};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/homeauto-api/config.yaml";

/// Minimum registration interval in seconds.
pub const MIN_REGISTER_INTERVAL: u64 = 5;
/// Maximum registration interval in seconds (one day).
pub const MAX_REGISTER_INTERVAL: u64 = 86_400;
/// Longest identity token lifetime accepted by the token endpoint.
pub const MAX_TOKEN_LIFETIME: u64 = 3600;

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Serving port, bound on all interfaces.
    pub port: u16,
    /// Registration endpoint URL.
    pub register_function: String,
    /// Audience of the identity token.
    pub client_id: String,
    pub registration: RegistrationConfig,
    pub readings: ReadingsConfig,
    pub server: ServerConfig,
    /// Probe id to slot name.
    pub probes: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            register_function: String::new(),
            client_id: String::new(),
            registration: RegistrationConfig::default(),
            readings: ReadingsConfig::default(),
            server: ServerConfig::default(),
            probes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let format = ConfigFormat::from_path(path);
        format.parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        })
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return every error found.
    ///
    /// The registration endpoint and client id are only required while the
    /// registration loop is enabled.
    ///
    /// # Example
    ///
    /// ```
    /// use homeauto_api::Config;
    ///
    /// let mut config = Config::default();
    /// config.register_function = "https://example.com/register".to_string();
    /// config.client_id = "client".to_string();
    /// config.probes.insert("28-0001".to_string(), "pool".to_string());
    /// config.validate().expect("config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push(ValidationError::new("port", "port cannot be 0"));
        }

        if self.registration.enabled {
            if self.register_function.is_empty() {
                errors.push(ValidationError::new(
                    "registerFunction",
                    "registration endpoint is required",
                ));
            } else {
                errors.extend(validate_url("registerFunction", &self.register_function));
            }

            if self.client_id.trim().is_empty() {
                errors.push(ValidationError::new("clientId", "client id cannot be empty"));
            }
        }

        errors.extend(self.registration.validate());
        errors.extend(self.readings.validate());
        errors.extend(self.server.validate());
        errors.extend(self.validate_probes());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn validate_probes(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.probes.is_empty() {
            errors.push(ValidationError::new("probes", "at least one probe is required"));
            return errors;
        }

        let mut slots = BTreeSet::new();
        for (id, slot) in &self.probes {
            let field = format!("probes.{}", id);
            if id.trim().is_empty() {
                errors.push(ValidationError::new(field.as_str(), "probe id cannot be empty"));
            }
            match ProbeSlot::new(slot.as_str()) {
                Ok(slot) => {
                    slots.insert(slot);
                }
                Err(e) => errors.push(ValidationError::new(field, e.to_string())),
            }
        }

        if self.readings.window < slots.len() {
            errors.push(ValidationError::new(
                "readings.window",
                format!(
                    "window {} is smaller than the {} distinct slot(s) configured",
                    self.readings.window,
                    slots.len()
                ),
            ));
        }

        errors
    }

    /// Build the probe-to-slot mapping.
    pub fn slot_map(&self) -> Result<ProbeSlotMap, ConfigError> {
        let mut map = ProbeSlotMap::new();
        let mut errors = Vec::new();

        for (id, slot) in &self.probes {
            let field = format!("probes.{}", id);
            match (ProbeId::new(id.trim()), ProbeSlot::new(slot.as_str())) {
                (Ok(id), Ok(slot)) => {
                    map.insert(id, slot);
                }
                (Err(e), _) | (_, Err(e)) => {
                    errors.push(ValidationError::new(field, e.to_string()));
                }
            }
        }

        if errors.is_empty() {
            Ok(map)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Self-registration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrationConfig {
    /// Run the registration loop.
    pub enabled: bool,
    /// Seconds between registration attempts.
    pub interval_secs: u64,
    /// Service-account credentials file.
    pub credentials_path: PathBuf,
    /// Service answering with the caller's public address.
    pub ip_echo_url: String,
    /// Reject echo responses that are not IP literals.
    pub strict_address: bool,
    pub token_mode: TokenMode,
    pub token_lifetime_secs: u64,
    /// Per-request timeout for token, echo and registration calls.
    pub timeout_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            ip_echo_url: DEFAULT_IP_ECHO_URL.to_string(),
            strict_address: false,
            token_mode: TokenMode::default(),
            token_lifetime_secs: MAX_TOKEN_LIFETIME,
            timeout_secs: 10,
        }
    }
}

impl RegistrationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    /// Validate registration settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(MIN_REGISTER_INTERVAL..=MAX_REGISTER_INTERVAL).contains(&self.interval_secs) {
            errors.push(ValidationError::new(
                "registration.intervalSecs",
                format!(
                    "interval {}s is out of range (must be {}-{} seconds)",
                    self.interval_secs, MIN_REGISTER_INTERVAL, MAX_REGISTER_INTERVAL
                ),
            ));
        }

        errors.extend(validate_url("registration.ipEchoUrl", &self.ip_echo_url));

        if self.token_lifetime_secs == 0 || self.token_lifetime_secs > MAX_TOKEN_LIFETIME {
            errors.push(ValidationError::new(
                "registration.tokenLifetimeSecs",
                format!("token lifetime must be 1-{} seconds", MAX_TOKEN_LIFETIME),
            ));
        }

        if self.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "registration.timeoutSecs",
                "timeout cannot be 0",
            ));
        }

        errors
    }
}

/// Reading store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadingsConfig {
    /// Search endpoint queried for the latest readings.
    pub search_url: String,
    /// Number of newest readings considered per request.
    pub window: usize,
    pub timestamp_field: String,
    pub timeout_secs: u64,
}

impl Default for ReadingsConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            window: DEFAULT_WINDOW,
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ReadingsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate reading store settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = validate_url("readings.searchUrl", &self.search_url);

        if self.window == 0 {
            errors.push(ValidationError::new("readings.window", "window cannot be 0"));
        }
        if self.timestamp_field.is_empty() {
            errors.push(ValidationError::new(
                "readings.timestampField",
                "timestamp field cannot be empty",
            ));
        }
        if self.timeout_secs == 0 {
            errors.push(ValidationError::new("readings.timeoutSecs", "timeout cannot be 0"));
        }

        errors
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Inbound request timeout in seconds.
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            shutdown_grace_secs: 15,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Validate server settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "server.requestTimeoutSecs",
                "request timeout cannot be 0",
            ));
        }

        errors
    }
}

fn validate_url(field: &str, url: &str) -> Vec<ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Vec::new()
    } else {
        vec![ValidationError::new(
            field,
            format!("invalid URL '{}': must start with http:// or https://", url),
        )]
    }
}

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension, falling back to TOML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    fn parse(self, content: &str) -> Result<Config, String> {
        match self {
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "YAML"),
            Self::Json => write!(f, "JSON"),
            Self::Toml => write!(f, "TOML"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config file {path}: {message}")]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        message: String,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error("Failed to apply configuration: {0}")]
    Setup(#[from] homeauto_core::Error),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `registration.intervalSecs` or `probes.28-0001`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}
