//! Backend abstraction

use crate::types::{
    GetObjectResult, ListObjectsOptions, ListObjectsResult, PresignRequest, PutObjectResult,
};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// The object-storage primitives the gateway relies on.
///
/// [`crate::S3Client`] is the production implementation; tests substitute
/// in-memory doubles.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of objects
    async fn list_objects(&self, options: &ListObjectsOptions) -> Result<ListObjectsResult>;

    /// Store an object
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectResult>;

    /// Fetch an object
    async fn get_object(&self, key: &str) -> Result<GetObjectResult>;

    /// Delete an object
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Produce a time-limited signed reference
    async fn presign(&self, request: &PresignRequest) -> Result<String>;
}
