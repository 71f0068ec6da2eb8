//! Backend configuration

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Region used for signing when the backend does not care (R2 and most
/// S3-compatible services accept `auto`).
pub const DEFAULT_REGION: &str = "auto";

/// Connection settings for one S3-compatible backend
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Endpoint URL (e.g. `https://<account>.r2.cloudflarestorage.com`)
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_key: SecretString,
    /// Signing region
    pub region: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_key: SecretString::from(String::new()),
            region: DEFAULT_REGION.to_string(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(15),
            user_agent: format!("stowage-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BackendConfig {
    /// Create a config for the given endpoint, bucket and credentials
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_key: SecretString::from(secret_key.into()),
            ..Default::default()
        }
    }

    /// Set the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set connect and request timeouts
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.timeout = request;
        self
    }

    /// Endpoint without trailing slashes
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// True when every field needed to talk to the backend is present
    pub fn is_complete(&self) -> bool {
        !self.endpoint.is_empty()
            && !self.bucket.is_empty()
            && !self.access_key_id.is_empty()
            && !self.secret_key.expose_secret().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_strips_trailing_slashes() {
        let config = BackendConfig::new("https://example.com//", "b", "k", "s");
        assert_eq!(config.base_url(), "https://example.com");
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let config = BackendConfig::new("https://example.com", "b", "k", "super-secret-value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-value"));
        assert!(config.is_complete());
    }
}
