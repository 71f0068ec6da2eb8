//! Shared helpers for gateway tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stowage_cli::{routes, AppState, BackendFactory, EffectiveConfig, GatewayConfig, StorageDefaults};
use stowage_client::{
    ClientError, GetObjectResult, ListObjectsOptions, ListObjectsResult, NetworkFailure,
    ObjectDescriptor, ObjectStore, PresignRequest, PutObjectResult,
};
use tokio::net::TcpListener;

/// A stored object
#[derive(Clone, Debug)]
pub struct Stored {
    pub key: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// In-memory backend that counts every call
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<Stored>>,
    pub list_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub presign_calls: AtomicUsize,
    /// Prefixes seen by list calls
    pub prefixes: Mutex<Vec<Option<String>>>,
    /// Keys whose deletion fails
    pub undeletable: Mutex<HashSet<String>>,
    /// Number of upcoming list calls that fail
    pub list_failures: AtomicUsize,
    /// Error returned by failing list calls
    pub list_error: Mutex<Option<fn() -> ClientError>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_objects(keys: &[&str]) -> Arc<Self> {
        let store = Self::new();
        for key in keys {
            store.insert(key, Bytes::from(format!("data:{}", key)));
        }
        store
    }

    pub fn insert(&self, key: &str, data: Bytes) {
        self.objects.lock().unwrap().push(Stored {
            key: key.to_string(),
            data,
            content_type: None,
        });
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().iter().map(|o| o.key.clone()).collect()
    }

    pub fn object(&self, key: &str) -> Option<Stored> {
        self.objects.lock().unwrap().iter().find(|o| o.key == key).cloned()
    }

    /// Fail the next `n` list calls with `error`
    pub fn fail_lists(&self, n: usize, error: fn() -> ClientError) {
        self.list_failures.store(n, Ordering::SeqCst);
        *self.list_error.lock().unwrap() = Some(error);
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.put_calls.load(Ordering::SeqCst)
            + self.get_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
            + self.presign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, options: &ListObjectsOptions) -> stowage_client::Result<ListObjectsResult> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.prefixes.lock().unwrap().push(options.prefix.clone());

        let remaining = self.list_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.list_failures.store(remaining - 1, Ordering::SeqCst);
            if let Some(error) = *self.list_error.lock().unwrap() {
                return Err(error());
            }
        }

        let prefix = options.prefix.clone().unwrap_or_default();
        let mut objects: Vec<ObjectDescriptor> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.key.starts_with(&prefix))
            .map(|o| ObjectDescriptor {
                key: o.key.clone(),
                last_modified: Some("2024-01-01T00:00:00.000Z".to_string()),
                etag: Some(format!("\"{}\"", o.key.len())),
                size: o.data.len() as u64,
                storage_class: Some("STANDARD".to_string()),
            })
            .collect();
        if let Some(max_keys) = options.max_keys {
            objects.truncate(max_keys);
        }

        Ok(ListObjectsResult {
            objects,
            is_truncated: false,
            next_continuation_token: None,
        })
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> stowage_client::Result<PutObjectResult> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|o| o.key != key);
        objects.push(Stored {
            key: key.to_string(),
            data,
            content_type: content_type.map(str::to_string),
        });
        Ok(PutObjectResult { etag: None })
    }

    async fn get_object(&self, key: &str) -> stowage_client::Result<GetObjectResult> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let object = self.object(key).ok_or_else(|| ClientError::S3Error {
            status: 404,
            code: "NoSuchKey".to_string(),
            message: "The specified key does not exist.".to_string(),
            request_id: None,
        })?;
        Ok(GetObjectResult {
            data: object.data,
            content_type: object.content_type,
            etag: None,
            metadata: Default::default(),
        })
    }

    async fn delete_object(&self, key: &str) -> stowage_client::Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.undeletable.lock().unwrap().contains(key) {
            return Err(ClientError::S3Error {
                status: 403,
                code: "AccessDenied".to_string(),
                message: "Access Denied".to_string(),
                request_id: None,
            });
        }
        self.objects.lock().unwrap().retain(|o| o.key != key);
        Ok(())
    }

    async fn presign(&self, request: &PresignRequest) -> stowage_client::Result<String> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("memory://{}?method={}", request.key, request.method.as_str()))
    }
}

/// Factory handing out one shared [`MemoryStore`]
pub struct MemoryFactory {
    pub store: Arc<MemoryStore>,
    pub creates: AtomicUsize,
    /// `(access key id, bucket, endpoint)` of every created backend
    pub seen: Mutex<Vec<(String, String, String)>>,
}

impl MemoryFactory {
    pub fn new(store: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            creates: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

impl BackendFactory for MemoryFactory {
    fn create(&self, config: &EffectiveConfig) -> Result<Arc<dyn ObjectStore>, ClientError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            config.access_key_id.clone(),
            config.bucket_name.clone(),
            config.endpoint.clone(),
        ));
        Ok(self.store.clone())
    }
}

pub fn connection_reset() -> ClientError {
    ClientError::Network {
        kind: NetworkFailure::ConnectionReset,
        message: "connection reset by peer".to_string(),
    }
}

pub fn signature_mismatch() -> ClientError {
    ClientError::S3Error {
        status: 403,
        code: "SignatureDoesNotMatch".to_string(),
        message: "The request signature we calculated does not match the signature you provided."
            .to_string(),
        request_id: None,
    }
}

pub fn full_defaults() -> StorageDefaults {
    StorageDefaults::from_lookup(|key| {
        let value = match key {
            "CLOUDFLARE_R2_ACCESS_KEY_ID" => "test-access-key",
            "CLOUDFLARE_R2_SECRET_ACCESS_KEY" => "0123456789abcdefSECRET",
            "CLOUDFLARE_R2_BUCKET_NAME" => "media",
            "CLOUDFLARE_R2_ENDPOINT" => "https://account.r2.cloudflarestorage.com",
            _ => return None,
        };
        Some(value.to_string())
    })
}

/// Gateway config suited to tests: fast retries, no probe
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_delay_ms: 1,
        probe_enabled: false,
        ..Default::default()
    }
}

/// Serve `state` on a random port
pub async fn serve(state: AppState) -> String {
    let app = routes::create_router(Arc::new(state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Serve a gateway backed by `factory`
pub async fn spawn_server(defaults: StorageDefaults, factory: Arc<MemoryFactory>) -> String {
    let state = AppState::new(test_config(), defaults)
        .unwrap()
        .with_backends(factory)
        .with_probe(None);
    serve(state).await
}
