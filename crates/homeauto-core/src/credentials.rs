//! Loading service-account credentials from disk.

use std::path::Path;

use homeauto_types::Credentials;

use crate::error::{Error, Result};

/// Default credential file location.
pub const DEFAULT_CREDENTIALS_PATH: &str = "/etc/homeauto-api/credentials.json";

/// Read and parse a service-account JSON key file.
///
/// Both an unreadable file and an unparsable document are reported as
/// [`Error::Credential`]; the message names the path but never the contents.
pub fn load_credentials<P: AsRef<Path>>(path: P) -> Result<Credentials> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Credential(format!("failed to read credentials file {}: {}", path.display(), e))
    })?;

    Credentials::from_json(&content).map_err(|e| {
        Error::Credential(format!("failed to parse credentials file {}: {}", path.display(), e))
    })
}
