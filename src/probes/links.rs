//! Link reachability probing
//!
//! A probe never fails: transport errors, timeouts and unparseable URLs all
//! come back as a [`LinkStatus`] that is not accessible.

use crate::error::Result;
use crate::loaders::http_client;
use crate::settings::{Settings, DEFAULT_PROBE_TIMEOUT};
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Outcome of probing one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    /// The URL as found in the record
    pub url: String,
    /// Final URL after redirects
    pub resolved: Option<String>,
    /// Whether the final response status was below 300
    pub accessible: bool,
    /// Whether the link was reached over HTTPS with certificate verification
    pub tls_verified: bool,
    /// `Content-Type` without parameters
    pub mime_type: Option<String>,
}

impl LinkStatus {
    /// Status of a link that could not be reached
    pub fn unreachable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resolved: None,
            accessible: false,
            tls_verified: false,
            mime_type: None,
        }
    }
}

/// Something that can tell whether a link resolves
pub trait LinkProbe {
    /// Probe `url`
    fn check(&self, url: &str) -> LinkStatus;
}

/// Probe over HTTP(S) with a blocking client
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
    verify_tls: bool,
}

impl HttpProbe {
    /// Create a probe with the default timeout, verifying certificates first
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            verify_tls: true,
        }
    }

    /// Create a probe from runtime settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout: settings.probe_timeout(),
            verify_tls: settings.verify_tls(),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether the first attempt verifies certificates
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    fn attempt(&self, url: &Url, verify_tls: bool) -> Result<Response> {
        let client = http_client(self.timeout, verify_tls)?;
        let response = match client.head(url.clone()).send() {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("HEAD {} returned {}, retrying with GET", url, response.status());
                client.get(url.clone()).send()?
            }
            Err(head_err) => {
                debug!("HEAD {} failed: {}, retrying with GET", url, head_err);
                client.get(url.clone()).send()?
            }
        };
        Ok(response)
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkProbe for HttpProbe {
    fn check(&self, url: &str) -> LinkStatus {
        let parsed = match Url::parse(url.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            Ok(parsed) => {
                debug!("Not probing {} link {}", parsed.scheme(), url);
                return LinkStatus::unreachable(url);
            }
            Err(err) => {
                debug!("Not a URL: {} ({})", url, err);
                return LinkStatus::unreachable(url);
            }
        };

        let (response, verified) = match self.attempt(&parsed, self.verify_tls) {
            Ok(response) => (response, self.verify_tls),
            Err(err) if self.verify_tls => {
                warn!("{}", err);
                warn!("Retrying {} without certificate verification", url);
                match self.attempt(&parsed, false) {
                    Ok(response) => (response, false),
                    Err(err) => {
                        debug!("{} cannot be reached: {}", url, err);
                        return LinkStatus::unreachable(url);
                    }
                }
            }
            Err(err) => {
                debug!("{} cannot be reached: {}", url, err);
                return LinkStatus::unreachable(url);
            }
        };

        let resolved = response.url().clone();
        let accessible = response.status().as_u16() < 300;
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());

        LinkStatus {
            url: url.to_string(),
            tls_verified: verified && accessible && resolved.scheme() == "https",
            resolved: Some(resolved.to_string()),
            accessible,
            mime_type,
        }
    }
}
