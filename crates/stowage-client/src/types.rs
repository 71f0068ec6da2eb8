//! Common types for the storage client

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// An object entry as reported by the backend's list operation.
///
/// Field names follow the backend's wire names so the entry can be handed to
/// callers verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectDescriptor {
    /// Object key
    pub key: String,
    /// Last modified time, as reported (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// ETag, including the backend's quoting
    #[serde(rename = "ETag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Storage class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Options for listing objects
#[derive(Clone, Debug, Default)]
pub struct ListObjectsOptions {
    /// Filter by prefix
    pub prefix: Option<String>,
    /// Maximum keys to return
    pub max_keys: Option<usize>,
    /// Continuation token from a previous page
    pub continuation_token: Option<String>,
}

impl ListObjectsOptions {
    /// List under a prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    /// Limit the page size
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Continue from a previous page
    pub fn after(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }
}

/// One page of a list operation
#[derive(Clone, Debug, Default)]
pub struct ListObjectsResult {
    /// Objects in backend order
    pub objects: Vec<ObjectDescriptor>,
    /// Whether more pages follow
    pub is_truncated: bool,
    /// Token for fetching the next page
    pub next_continuation_token: Option<String>,
}

/// Put object result
#[derive(Clone, Debug)]
pub struct PutObjectResult {
    /// ETag of the stored object
    pub etag: Option<String>,
}

/// Get object result
#[derive(Clone, Debug)]
pub struct GetObjectResult {
    /// Object data
    pub data: Bytes,
    /// Content type
    pub content_type: Option<String>,
    /// ETag
    pub etag: Option<String>,
    /// User metadata (`x-amz-meta-*` with the prefix stripped)
    pub metadata: HashMap<String, String>,
}

/// Which capability a signed reference grants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresignMethod {
    /// Download (GET)
    Get,
    /// Upload (PUT)
    Put,
}

impl PresignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

/// Parameters for a time-limited signed reference
#[derive(Clone, Debug)]
pub struct PresignRequest {
    pub method: PresignMethod,
    pub key: String,
    pub expires_in: Duration,
    /// Content type the uploader must send (PUT only)
    pub content_type: Option<String>,
    /// Content-Disposition the backend should answer with (GET only)
    pub content_disposition: Option<String>,
}

impl PresignRequest {
    /// Signed upload reference
    pub fn put(key: impl Into<String>, content_type: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            method: PresignMethod::Put,
            key: key.into(),
            expires_in,
            content_type: Some(content_type.into()),
            content_disposition: None,
        }
    }

    /// Signed download reference
    pub fn get(key: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            method: PresignMethod::Get,
            key: key.into(),
            expires_in,
            content_type: None,
            content_disposition: None,
        }
    }

    /// Ask the backend to answer with this Content-Disposition
    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }
}
