//! Resource loading utilities
//!
//! This module reads records and bundle artifacts from files and URLs.
//! Remote fetches verify TLS first and, on a transport failure, retry once
//! without certificate verification.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use crate::settings::{Settings, DEFAULT_PROBE_TIMEOUT};
use reqwest::blocking::Client;
use std::fs;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of redirects followed by any client
const MAX_REDIRECTS: usize = 10;

/// Build a blocking HTTP client
pub fn http_client(timeout: Duration, verify_tls: bool) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(!verify_tls)
        .user_agent(concat!("wcmp/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Resource loader for records and bundle artifacts
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
    /// Per-request timeout
    timeout: Duration,
    /// Whether the first attempt verifies TLS
    verify_tls: bool,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: true,
            timeout: DEFAULT_PROBE_TIMEOUT,
            verify_tls: true,
        }
    }

    /// Create a loader from runtime settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            limits: settings.limits().clone(),
            allow_remote: settings.allow_remote(),
            timeout: settings.probe_timeout(),
            verify_tls: settings.verify_tls(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Limits applied by this loader
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a resource as bytes
    pub fn load_bytes(&self, location: &Location) -> Result<Vec<u8>> {
        match location {
            Location::Path(path) => {
                let content = fs::read(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;

                self.limits.check_document_size(content.len())?;

                Ok(content)
            }
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(
                        "Remote resources are not allowed".to_string(),
                    ));
                }
                self.fetch(url.as_str())
            }
            Location::String(s) => {
                self.limits.check_document_size(s.len())?;
                Ok(s.as_bytes().to_vec())
            }
        }
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        let bytes = self.load_bytes(location)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Resource(format!("'{}' is not valid UTF-8: {}", location, e)))
    }

    /// Fetch a URL, retrying once without certificate verification
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);
        let first = self.fetch_once(url, self.verify_tls);
        let body = match first {
            Err(Error::Http(err)) if self.verify_tls => {
                warn!("{}", err);
                warn!("Retrying {} without certificate verification", url);
                self.fetch_once(url, false)?
            }
            other => other?,
        };
        self.limits.check_document_size(body.len())?;
        Ok(body)
    }

    fn fetch_once(&self, url: &str, verify_tls: bool) -> Result<Vec<u8>> {
        let client = http_client(self.timeout, verify_tls)?;
        let response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Resource(format!(
                "GET {} returned status {}",
                url,
                status.as_u16()
            )));
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
