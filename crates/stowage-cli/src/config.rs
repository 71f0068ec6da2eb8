//! Gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use stowage_client::{RetryPolicy, DEFAULT_PROBE_TARGETS};

/// Environment variable holding the default access key id
pub const ENV_ACCESS_KEY_ID: &str = "CLOUDFLARE_R2_ACCESS_KEY_ID";
/// Environment variable holding the default secret key
pub const ENV_SECRET_ACCESS_KEY: &str = "CLOUDFLARE_R2_SECRET_ACCESS_KEY";
/// Environment variable holding the default bucket
pub const ENV_BUCKET_NAME: &str = "CLOUDFLARE_R2_BUCKET_NAME";
/// Environment variable holding the default endpoint
pub const ENV_ENDPOINT: &str = "CLOUDFLARE_R2_ENDPOINT";

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path of the action endpoint
    pub api_path: String,
    /// Path prefix served by the reverse proxy
    pub proxy_prefix: String,
    /// Backend root used by the proxy when no endpoint is configured
    pub proxy_fallback_endpoint: Option<String>,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Backend connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Backend request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Total attempts per backend call
    pub max_retries: u32,
    /// Delay after the first failed attempt (milliseconds)
    pub base_delay_ms: u64,
    /// Run the connectivity probe between retries
    pub probe_enabled: bool,
    /// Endpoints checked by the connectivity probe
    pub probe_targets: Vec<String>,
    /// Connectivity probe deadline (seconds)
    pub probe_timeout_secs: u64,
    /// Concurrent deletes issued by `deleteFolder`
    pub delete_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_path: "/api/r2".to_string(),
            proxy_prefix: "/r2-proxy".to_string(),
            proxy_fallback_endpoint: None,
            max_body_size: 100 * 1024 * 1024, // 100 MiB
            connect_timeout_secs: 10,
            request_timeout_secs: 15,
            max_retries: 3,
            base_delay_ms: 1000,
            probe_enabled: true,
            probe_targets: DEFAULT_PROBE_TARGETS.iter().map(|t| t.to_string()).collect(),
            probe_timeout_secs: 5,
            delete_concurrency: 16,
        }
    }
}

impl GatewayConfig {
    /// Layer built-in defaults, an optional config file and `STOWAGE__*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(
                config::Environment::with_prefix("STOWAGE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("probe_targets"),
            )
            .build()?
            .try_deserialize::<Self>()
            .and_then(|config| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Reject route paths the router cannot mount
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        for (name, value) in [("api_path", &self.api_path), ("proxy_prefix", &self.proxy_prefix)] {
            if !value.starts_with('/') {
                return Err(config::ConfigError::Message(format!(
                    "{} must start with '/', got '{}'",
                    name, value
                )));
            }
            if value.contains(['{', '}']) {
                return Err(config::ConfigError::Message(format!(
                    "{} must not contain route parameters, got '{}'",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Retry policy applied to every backend call
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }

    /// Proxy prefix without a trailing slash
    pub fn proxy_prefix(&self) -> &str {
        self.proxy_prefix.trim_end_matches('/')
    }
}

/// Storage credentials taken from the process environment
#[derive(Clone)]
pub struct StorageDefaults {
    pub access_key_id: String,
    pub secret_key: SecretString,
    pub bucket_name: String,
    pub endpoint: String,
}

impl std::fmt::Debug for StorageDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageDefaults")
            .field("access_key_id", &self.access_key_id)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Default for StorageDefaults {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_key: SecretString::from(String::new()),
            bucket_name: String::new(),
            endpoint: String::new(),
        }
    }
}

impl StorageDefaults {
    /// Read the `CLOUDFLARE_R2_*` variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read defaults through an arbitrary lookup; missing keys become empty
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();

        Self {
            access_key_id: get(ENV_ACCESS_KEY_ID),
            secret_key: SecretString::from(get(ENV_SECRET_ACCESS_KEY)),
            bucket_name: get(ENV_BUCKET_NAME),
            endpoint: get(ENV_ENDPOINT),
        }
    }

    /// True when all four values are present
    pub fn has_config(&self) -> bool {
        !self.access_key_id.is_empty()
            && !self.secret_key.expose_secret().is_empty()
            && !self.bucket_name.is_empty()
            && !self.endpoint.is_empty()
    }

    /// Endpoint with trailing slashes removed, if set
    pub fn endpoint_root(&self) -> Option<&str> {
        let root = self.endpoint.trim_end_matches('/');
        (!root.is_empty()).then_some(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.api_path, "/api/r2");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.probe_targets.len(), DEFAULT_PROBE_TARGETS.len());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = 8080
proxy_prefix = "/files"
max_retries = 5
probe_targets = ["https://example.com"]
"#
        )
        .unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.proxy_prefix, "/files");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.probe_targets, vec!["https://example.com".to_string()]);
        // untouched keys keep their defaults
        assert_eq!(config.api_path, "/api/r2");
        assert_eq!(config.base_delay_ms, 1000);
        assert!(config.proxy_fallback_endpoint.is_none());
    }

    #[rstest]
    #[case("api_path = \"api/r2\"", "api_path")]
    #[case("proxy_prefix = \"r2-proxy\"", "proxy_prefix")]
    #[case("proxy_prefix = \"/files/{id}\"", "proxy_prefix")]
    fn test_load_rejects_unroutable_paths(#[case] line: &str, #[case] field: &str) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "{}", line).unwrap();

        let err = GatewayConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains(field), "got {}", err);
    }

    #[test]
    fn test_validate_after_overrides() {
        let config = GatewayConfig {
            api_path: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = GatewayConfig::load(Some(Path::new("/nonexistent/stowage.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_defaults_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_ACCESS_KEY_ID, "AKID"),
            (ENV_SECRET_ACCESS_KEY, "abcdefghijklmnop"),
            (ENV_BUCKET_NAME, "photos"),
            (ENV_ENDPOINT, "https://account.r2.cloudflarestorage.com//"),
        ]
        .into_iter()
        .collect();

        let defaults = StorageDefaults::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(defaults.has_config());
        assert_eq!(
            defaults.endpoint_root(),
            Some("https://account.r2.cloudflarestorage.com")
        );
        assert!(!format!("{:?}", defaults).contains("abcdefghijklmnop"));
    }

    #[test]
    fn test_storage_defaults_partial() {
        let defaults = StorageDefaults::from_lookup(|k| {
            (k == ENV_BUCKET_NAME).then(|| "photos".to_string())
        });
        assert!(!defaults.has_config());
        assert_eq!(defaults.endpoint_root(), None);
    }
}
