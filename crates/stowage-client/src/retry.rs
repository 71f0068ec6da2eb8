//! Classified retry with exponential backoff
//!
//! Every backend call issued by the gateway goes through [`RetryingClient`].
//! Transient network failures are retried with a growing delay; everything
//! else is returned on first occurrence.

use crate::{
    classify::classify,
    probe::ConnectivityProbe,
    store::ObjectStore,
    types::*,
    ClientError, Result,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff settings
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_retries: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth factor applied per further attempt
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    /// Delay to wait after `attempt` (1-based) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Decide what to do about a failure observed on `attempt`
    pub fn decide(&self, error: &ClientError, attempt: u32) -> RetryDecision {
        let is_transient = classify(error).is_transient();
        let delay_ms = if is_transient && attempt < self.max_retries {
            self.delay_for(attempt).as_millis() as u64
        } else {
            0
        };

        RetryDecision {
            is_transient,
            attempt,
            delay_ms,
        }
    }
}

/// Outcome of classifying one failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryDecision {
    pub is_transient: bool,
    pub attempt: u32,
    /// Zero when no further attempt will be made
    pub delay_ms: u64,
}

/// [`ObjectStore`] wrapper applying a [`RetryPolicy`] to every call
#[derive(Clone)]
pub struct RetryingClient {
    inner: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    probe: Option<Arc<dyn ConnectivityProbe>>,
}

impl std::fmt::Debug for RetryingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingClient")
            .field("policy", &self.policy)
            .field("probe", &self.probe.is_some())
            .finish_non_exhaustive()
    }
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn ObjectStore>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            probe: None,
        }
    }

    /// Run the probe between attempts. The result is only logged.
    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = name, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let decision = self.policy.decide(&error, attempt);
            if !decision.is_transient {
                debug!(operation = name, attempt, error = %error, "Permanent failure, not retrying");
                return Err(error);
            }
            if attempt >= max_attempts {
                warn!(operation = name, attempts = attempt, error = %error, "Retry budget exhausted");
                return Err(error);
            }

            warn!(
                operation = name,
                attempt,
                max_attempts,
                delay_ms = decision.delay_ms,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(Duration::from_millis(decision.delay_ms)).await;

            if let Some(probe) = &self.probe {
                if probe.probe().await {
                    info!(operation = name, "Network reachable, retrying");
                } else {
                    warn!(operation = name, "Network looks unreachable, retrying anyway");
                }
            }

            attempt += 1;
        }
    }

    /// List every object under `prefix`, following continuation tokens.
    /// Each page is retried independently.
    pub async fn list_all(&self, prefix: Option<&str>) -> Result<Vec<ObjectDescriptor>> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let options = ListObjectsOptions {
                prefix: prefix.map(str::to_string),
                max_keys: None,
                continuation_token: token.take(),
            };
            let page = self
                .execute("list", || self.inner.list_objects(&options))
                .await?;

            objects.extend(page.objects);
            match page.next_continuation_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        Ok(objects)
    }
}

#[async_trait]
impl ObjectStore for RetryingClient {
    async fn list_objects(&self, options: &ListObjectsOptions) -> Result<ListObjectsResult> {
        self.execute("list", || self.inner.list_objects(options)).await
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectResult> {
        self.execute("put", || self.inner.put_object(key, data.clone(), content_type))
            .await
    }

    async fn get_object(&self, key: &str) -> Result<GetObjectResult> {
        self.execute("get", || self.inner.get_object(key)).await
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.execute("delete", || self.inner.delete_object(key)).await
    }

    async fn presign(&self, request: &PresignRequest) -> Result<String> {
        self.execute("presign", || self.inner.presign(request)).await
    }
}
