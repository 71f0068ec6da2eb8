//! Best-effort outbound connectivity check

use async_trait::async_trait;
use futures::future::select_ok;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Well-known endpoints used to check general internet reachability
pub const DEFAULT_PROBE_TARGETS: &[&str] = &[
    "https://www.cloudflare.com",
    "https://www.google.com",
    "https://www.baidu.com",
];

/// Advisory reachability check. Implementations must never fail and must
/// finish within their own deadline.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// `true` when at least one well-known endpoint answered
    async fn probe(&self) -> bool;
}

/// Probe that issues `HEAD` requests against a fixed list of targets
#[derive(Clone, Debug)]
pub struct HttpConnectivityProbe {
    client: Client,
    targets: Vec<String>,
    timeout: Duration,
}

impl HttpConnectivityProbe {
    /// Build a probe with its own client; falls back to a default client if
    /// the builder cannot be configured.
    pub fn new(targets: Vec<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            targets,
            timeout,
        }
    }

    /// Probe the default targets with a 5 second deadline
    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_PROBE_TARGETS.iter().map(|t| t.to_string()).collect(),
            Duration::from_secs(5),
        )
    }

    /// Targets checked by this probe
    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn probe(&self) -> bool {
        if self.targets.is_empty() {
            return false;
        }

        let attempts = self.targets.iter().map(|target| {
            let request = self.client.head(target).send();
            Box::pin(async move {
                request.await.map(|_| target.clone()).map_err(|e| {
                    debug!(target = %target, error = %e, "Probe target unreachable");
                    e
                })
            })
        });

        match tokio::time::timeout(self.timeout, select_ok(attempts)).await {
            Ok(Ok((target, _))) => {
                debug!(target = %target, "Connectivity probe succeeded");
                true
            }
            Ok(Err(_)) => false,
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Connectivity probe timed out");
                false
            }
        }
    }
}
