//! Signed upload and download references

use super::ActionDispatcher;
use crate::error::ApiError;
use crate::resolver::EffectiveConfig;
use serde::Serialize;
use std::time::Duration;
use stowage_client::{ObjectStore, PresignRequest};
use tracing::info;

/// Lifetime of signed references (seconds)
pub const SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Content type assumed for uploads that do not name one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResult {
    pub success: bool,
    pub upload_url: String,
    pub file_name: String,
    /// Must be sent as `Content-Type` with the upload
    pub content_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResult {
    pub success: bool,
    pub download_url: String,
    pub file_name: String,
    pub expires_in: u64,
}

/// `Content-Disposition` suggesting the last path segment as the file name
pub fn attachment_disposition(key: &str) -> String {
    let name = key.rsplit('/').find(|s| !s.is_empty()).unwrap_or(key);
    let ascii: String = name
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(name)
    )
}

/// getUploadUrl - Time-limited PUT reference
pub async fn upload_url(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<UploadUrlResult, ApiError> {
    let file_name = config.require_file_name()?;
    let content_type = config
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    let client = dispatcher.client(config)?;

    let request = PresignRequest::put(
        file_name,
        content_type,
        Duration::from_secs(SIGNED_URL_EXPIRY_SECS),
    );
    let upload_url = client.presign(&request).await?;

    info!(bucket = %config.bucket_name, key = %file_name, "Issued upload URL");
    Ok(UploadUrlResult {
        success: true,
        upload_url,
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        expires_in: SIGNED_URL_EXPIRY_SECS,
    })
}

/// getDownloadUrl - Time-limited GET reference that downloads as a file
pub async fn download_url(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<DownloadUrlResult, ApiError> {
    let file_name = config.require_file_name()?;
    let client = dispatcher.client(config)?;

    let request = PresignRequest::get(file_name, Duration::from_secs(SIGNED_URL_EXPIRY_SECS))
        .with_content_disposition(attachment_disposition(file_name));
    let download_url = client.presign(&request).await?;

    info!(bucket = %config.bucket_name, key = %file_name, "Issued download URL");
    Ok(DownloadUrlResult {
        success: true,
        download_url,
        file_name: file_name.to_string(),
        expires_in: SIGNED_URL_EXPIRY_SECS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("report.pdf", "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf")]
    #[case("a/b/my file.txt", "attachment; filename=\"my file.txt\"; filename*=UTF-8''my%20file.txt")]
    #[case("photos/", "attachment; filename=\"photos\"; filename*=UTF-8''photos")]
    #[case("docs/报告.pdf", "attachment; filename=\"__.pdf\"; filename*=UTF-8''%E6%8A%A5%E5%91%8A.pdf")]
    fn test_attachment_disposition(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(attachment_disposition(key), expected);
    }
}
