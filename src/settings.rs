//! Runtime configuration
//!
//! [`Settings`] gathers everything that varies between installations: where
//! the bundle cache lives, how patient link probes are, and which resource
//! limits apply. It is built once per invocation and passed down by
//! reference.

use crate::limits::Limits;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "WCMP_CACHE_DIR";

/// Cache directory name under the user's home directory
pub const CACHE_DIR_NAME: &str = ".wcmp";

/// Default timeout applied to every network probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    cache_dir: PathBuf,
    probe_timeout: Duration,
    verify_tls: bool,
    allow_remote: bool,
    limits: Limits,
}

impl Settings {
    /// Create settings rooted at the given cache directory
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            verify_tls: true,
            allow_remote: true,
            limits: Limits::default(),
        }
    }

    /// Settings derived from the process environment
    ///
    /// Uses `$WCMP_CACHE_DIR` when set and non-empty, otherwise `~/.wcmp`.
    /// Falls back to a relative `.wcmp` when no home directory is known.
    pub fn from_env() -> Self {
        let cache_dir = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .map(|home| home.join(CACHE_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(CACHE_DIR_NAME)),
        };
        Self::new(cache_dir)
    }

    /// Set the cache directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Set the network probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set whether the first probe attempt verifies TLS certificates
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Set whether records may be fetched from URLs
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Network probe timeout
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Whether TLS is verified on the first attempt
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Whether remote records may be fetched
    pub fn allow_remote(&self) -> bool {
        self.allow_remote
    }

    /// Resource limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new("/tmp/wcmp-cache");
        assert_eq!(settings.cache_dir(), Path::new("/tmp/wcmp-cache"));
        assert_eq!(settings.probe_timeout(), Duration::from_secs(30));
        assert!(settings.verify_tls());
        assert!(settings.allow_remote());
        assert_eq!(settings.limits(), &Limits::default());
    }

    #[test]
    fn test_builder() {
        let settings = Settings::new("a")
            .with_cache_dir("b")
            .with_probe_timeout(Duration::from_secs(5))
            .with_verify_tls(false)
            .with_allow_remote(false)
            .with_limits(Limits::strict());

        assert_eq!(settings.cache_dir(), Path::new("b"));
        assert_eq!(settings.probe_timeout(), Duration::from_secs(5));
        assert!(!settings.verify_tls());
        assert!(!settings.allow_remote());
        assert_eq!(settings.limits(), &Limits::strict());
    }
}
