//! Application state

use crate::config::{GatewayConfig, StorageDefaults};
use crate::resolver::EffectiveConfig;
use std::sync::Arc;
use std::time::Duration;
use stowage_client::{
    ClientError, ConnectivityProbe, HttpConnectivityProbe, ObjectStore, RetryingClient, S3Client,
};
use tracing::info;

/// Builds a backend for one resolved configuration
pub trait BackendFactory: Send + Sync {
    fn create(&self, config: &EffectiveConfig) -> Result<Arc<dyn ObjectStore>, ClientError>;
}

/// Produces [`S3Client`]s that share one connection pool
#[derive(Clone, Debug)]
pub struct S3BackendFactory {
    http: reqwest::Client,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl S3BackendFactory {
    pub fn new(http: reqwest::Client, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            http,
            connect_timeout,
            request_timeout,
        }
    }
}

impl BackendFactory for S3BackendFactory {
    fn create(&self, config: &EffectiveConfig) -> Result<Arc<dyn ObjectStore>, ClientError> {
        let backend = config
            .backend_config()
            .with_timeouts(self.connect_timeout, self.request_timeout);
        let client = S3Client::with_http(backend, self.http.clone())?;
        Ok(Arc::new(client))
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Environment-sourced storage defaults
    pub defaults: StorageDefaults,
    /// Backend construction
    pub backends: Arc<dyn BackendFactory>,
    /// Connectivity probe, when enabled
    pub probe: Option<Arc<dyn ConnectivityProbe>>,
    /// HTTP client used by the reverse proxy
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: GatewayConfig, defaults: StorageDefaults) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(format!("stowage-gateway/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let probe: Option<Arc<dyn ConnectivityProbe>> = if config.probe_enabled {
            Some(Arc::new(HttpConnectivityProbe::new(
                config.probe_targets.clone(),
                config.probe_timeout(),
            )))
        } else {
            None
        };

        if defaults.has_config() {
            info!(bucket = %defaults.bucket_name, endpoint = %defaults.endpoint, "Default storage configuration loaded");
        } else {
            info!("No complete default storage configuration; requests must supply credentials");
        }

        Ok(Self {
            backends: Arc::new(S3BackendFactory::new(
                http.clone(),
                config.connect_timeout(),
                config.request_timeout(),
            )),
            config,
            defaults,
            probe,
            http,
        })
    }

    /// Replace the backend factory
    pub fn with_backends(mut self, backends: Arc<dyn BackendFactory>) -> Self {
        self.backends = backends;
        self
    }

    /// Replace the connectivity probe
    pub fn with_probe(mut self, probe: Option<Arc<dyn ConnectivityProbe>>) -> Self {
        self.probe = probe;
        self
    }

    /// Retrying client for one resolved configuration
    pub fn client(&self, config: &EffectiveConfig) -> Result<RetryingClient, ClientError> {
        let backend = self.backends.create(config)?;
        let client = RetryingClient::new(backend, self.config.retry_policy());

        Ok(match &self.probe {
            Some(probe) => client.with_probe(Arc::clone(probe)),
            None => client,
        })
    }

    /// Backend root the proxy forwards to
    pub fn proxy_root(&self) -> Option<String> {
        self.defaults
            .endpoint_root()
            .map(str::to_string)
            .or_else(|| {
                self.config
                    .proxy_fallback_endpoint
                    .as_deref()
                    .map(|e| e.trim_end_matches('/').to_string())
                    .filter(|e| !e.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{resolve, ActionBody};
    use secrecy::SecretString;

    fn defaults(endpoint: &str) -> StorageDefaults {
        StorageDefaults {
            access_key_id: "key".to_string(),
            secret_key: SecretString::from("secret".to_string()),
            bucket_name: "bucket".to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    #[test]
    fn test_proxy_root_prefers_env_endpoint() {
        let config = GatewayConfig {
            proxy_fallback_endpoint: Some("https://fallback.example.com/".to_string()),
            ..Default::default()
        };

        let state = AppState::new(config.clone(), defaults("https://r2.example.com///")).unwrap();
        assert_eq!(state.proxy_root().as_deref(), Some("https://r2.example.com"));

        let state = AppState::new(config, defaults("")).unwrap();
        assert_eq!(state.proxy_root().as_deref(), Some("https://fallback.example.com"));

        let state = AppState::new(GatewayConfig::default(), defaults("")).unwrap();
        assert!(state.proxy_root().is_none());
    }

    #[test]
    fn test_probe_disabled() {
        let config = GatewayConfig {
            probe_enabled: false,
            ..Default::default()
        };
        let state = AppState::new(config, StorageDefaults::default()).unwrap();
        assert!(state.probe.is_none());
    }

    #[test]
    fn test_s3_factory_rejects_bad_endpoint() {
        let state = AppState::new(GatewayConfig::default(), defaults("ftp://example.com")).unwrap();
        let config = resolve(&ActionBody::default(), &state.defaults);
        assert!(matches!(state.client(&config), Err(ClientError::Config(_))));
    }
}
