//! S3-compatible backend client

use crate::{
    config::BackendConfig,
    signing::{sha256_hex, uri_encode, Signer},
    store::ObjectStore,
    types::*,
    ClientError, Result,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{header, Client, Method, Response};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};
use url::Url;

/// Upper bound the backend accepts for signed reference lifetimes (7 days)
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;

/// Client for one bucket on an S3-compatible backend (path-style addressing)
#[derive(Clone)]
pub struct S3Client {
    config: BackendConfig,
    signer: Signer,
    http: Client,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("endpoint", &self.config.endpoint)
            .field("bucket", &self.config.bucket)
            .finish_non_exhaustive()
    }
}

impl S3Client {
    /// Create a new client with its own connection pool
    pub fn new(config: BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ClientError::Http)?;

        Self::with_http(config, http)
    }

    /// Create a client that shares an existing connection pool
    pub fn with_http(config: BackendConfig, http: Client) -> Result<Self> {
        if !config.is_complete() {
            return Err(ClientError::Config(
                "endpoint, bucket, access key id and secret key are required".to_string(),
            ));
        }

        let base = Url::parse(config.base_url())
            .map_err(|e| ClientError::Config(format!("invalid endpoint '{}': {}", config.endpoint, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "endpoint must be http(s), got '{}'",
                base.scheme()
            )));
        }

        let signer = Signer::from_config(&config);
        Ok(Self { config, signer, http })
    }

    /// Get the configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    // ==================== Object Operations ====================

    /// List one page of objects (ListObjectsV2)
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    pub async fn list_objects(&self, options: &ListObjectsOptions) -> Result<ListObjectsResult> {
        let mut query = vec![("list-type", "2".to_string())];

        if let Some(prefix) = &options.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if let Some(max_keys) = options.max_keys {
            query.push(("max-keys", max_keys.to_string()));
        }
        if let Some(token) = &options.continuation_token {
            query.push(("continuation-token", token.clone()));
        }

        let url = self.url(None, &query)?;
        let response = self.request(Method::GET, url, Vec::new(), None).await?;
        let text = response.text().await?;
        parse_list_objects_response(&text)
    }

    /// Put an object
    #[instrument(skip(self, data), fields(bucket = %self.config.bucket, size = data.len()))]
    pub async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectResult> {
        let url = self.url(Some(key), &[])?;

        let mut headers = Vec::new();
        if let Some(ct) = content_type {
            headers.push(("content-type", ct.to_string()));
        }

        let response = self.request(Method::PUT, url, headers, Some(data)).await?;

        Ok(PutObjectResult {
            etag: header_string(&response, header::ETAG),
        })
    }

    /// Get an object with its metadata
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    pub async fn get_object(&self, key: &str) -> Result<GetObjectResult> {
        let url = self.url(Some(key), &[])?;
        let response = self.request(Method::GET, url, Vec::new(), None).await?;

        let etag = header_string(&response, header::ETAG);
        let content_type = header_string(&response, header::CONTENT_TYPE);

        let mut metadata = HashMap::new();
        for (name, value) in response.headers().iter() {
            if let Some(key) = name.as_str().strip_prefix("x-amz-meta-") {
                if let Ok(v) = value.to_str() {
                    metadata.insert(key.to_string(), v.to_string());
                }
            }
        }

        let data = response.bytes().await?;

        Ok(GetObjectResult {
            data,
            content_type,
            etag,
            metadata,
        })
    }

    /// Delete an object
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        let url = self.url(Some(key), &[])?;
        self.request(Method::DELETE, url, Vec::new(), None).await?;
        Ok(())
    }

    /// Build a presigned URL; no request is sent
    pub fn presign_url(&self, request: &PresignRequest) -> Result<String> {
        let mut query = Vec::new();
        if let (PresignMethod::Get, Some(disposition)) =
            (request.method, &request.content_disposition)
        {
            query.push(("response-content-disposition", disposition.clone()));
        }

        let url = self.url(Some(&request.key), &query)?;
        let expires = request.expires_in.as_secs().clamp(1, MAX_PRESIGN_SECS);

        let signed_headers: Vec<(&str, &str)> = match (request.method, &request.content_type) {
            (PresignMethod::Put, Some(ct)) => vec![("content-type", ct.as_str())],
            _ => Vec::new(),
        };

        let signed = self
            .signer
            .presign(request.method.as_str(), &url, expires, &signed_headers, Utc::now());
        Ok(signed.into())
    }

    // ==================== Helper Methods ====================

    /// Path-style URL for the bucket or an object within it
    fn url(&self, key: Option<&str>, query: &[(&str, String)]) -> Result<Url> {
        let mut raw = format!(
            "{}/{}",
            self.config.base_url(),
            uri_encode(&self.config.bucket, true)
        );
        if let Some(key) = key {
            // URL parsing collapses dot segments, which would address another key
            if key.split('/').any(|segment| segment == "." || segment == "..") {
                return Err(ClientError::InvalidKey(key.to_string()));
            }
            raw.push('/');
            raw.push_str(&uri_encode(key, false));
        }

        let mut url = Url::parse(&raw)
            .map_err(|e| ClientError::Config(format!("invalid object URL '{}': {}", raw, e)))?;

        if !query.is_empty() {
            let qs = query
                .iter()
                .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&qs));
        }
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        headers: Vec<(&str, String)>,
        body: Option<Bytes>,
    ) -> Result<Response> {
        let payload_hash = sha256_hex(body.as_deref().unwrap_or_default());
        let to_sign: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let signed = self
            .signer
            .sign_headers(method.as_str(), &url, &to_sign, &payload_hash, Utc::now());

        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .timeout(self.config.timeout)
            .header(header::AUTHORIZATION, signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256);

        for (k, v) in headers {
            req = req.header(k, v);
        }

        if let Some(data) = body {
            req = req.body(data);
        }

        debug!("Sending {} request to {}", method, url.path());
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_s3_xml(&text, status.as_u16()));
        }

        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, options: &ListObjectsOptions) -> Result<ListObjectsResult> {
        S3Client::list_objects(self, options).await
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectResult> {
        S3Client::put_object(self, key, data, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<GetObjectResult> {
        S3Client::get_object(self, key).await
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        S3Client::delete_object(self, key).await
    }

    async fn presign(&self, request: &PresignRequest) -> Result<String> {
        self.presign_url(request)
    }
}

// ==================== Response Parsers ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ObjectDescriptor>,
    #[serde(default)]
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

fn parse_list_objects_response(xml: &str) -> Result<ListObjectsResult> {
    let parsed: ListBucketResult =
        quick_xml::de::from_str(xml).map_err(|e| ClientError::XmlParse(e.to_string()))?;

    Ok(ListObjectsResult {
        objects: parsed.contents,
        is_truncated: parsed.is_truncated,
        next_continuation_token: parsed.next_continuation_token,
    })
}

fn header_string(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
