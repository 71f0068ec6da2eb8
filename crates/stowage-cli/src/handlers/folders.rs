//! Folder operations
//!
//! Folders are implicit in a key namespace. Creating one writes a zero-length
//! marker object; deleting one removes every key under the prefix.

use super::{folder_prefix, ActionDispatcher};
use crate::error::ApiError;
use crate::resolver::EffectiveConfig;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use stowage_client::ObjectStore;
use tracing::{info, warn};

/// Name of the marker object placed in created folders
pub const FOLDER_MARKER: &str = ".keep";

/// Content type of folder markers
pub const FOLDER_CONTENT_TYPE: &str = "application/x-directory";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderResult {
    pub success: bool,
    pub message: String,
    pub folder_path: String,
    pub marker_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFolderResult {
    pub success: bool,
    pub message: String,
    pub folder_path: String,
    pub deleted_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedDelete>,
}

/// A key that could not be deleted
#[derive(Debug, Serialize)]
pub struct FailedDelete {
    pub key: String,
    pub error: String,
}

/// Marker key for a folder path
pub fn marker_key(folder_path: &str) -> String {
    format!("{}{}", folder_prefix(folder_path), FOLDER_MARKER)
}

/// createFolder - Write the folder's marker object. Repeating it overwrites
/// the same marker.
pub async fn create_folder(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<CreateFolderResult, ApiError> {
    let folder_path = config.require_folder_path()?;
    let client = dispatcher.client(config)?;
    let key = marker_key(folder_path);

    client
        .put_object(&key, Bytes::new(), Some(FOLDER_CONTENT_TYPE))
        .await?;

    info!(bucket = %config.bucket_name, key = %key, "Created folder");
    Ok(CreateFolderResult {
        success: true,
        message: format!("Folder {} created", folder_path),
        folder_path: folder_prefix(folder_path),
        marker_key: key,
    })
}

/// deleteFolder - Delete every object under the folder prefix.
///
/// Deletes run concurrently and independently: one failure does not stop the
/// others, and all failures are reported.
pub async fn delete_folder(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<DeleteFolderResult, ApiError> {
    let folder_path = config
        .file_name
        .as_deref()
        .or(config.folder_path.as_deref())
        .ok_or(ApiError::MissingParameter("folder path"))?;
    let prefix = folder_prefix(folder_path);
    let client = dispatcher.client(config)?;

    let keys: Vec<String> = client
        .list_all(Some(&prefix))
        .await?
        .into_iter()
        .map(|object| object.key)
        .collect();

    if keys.is_empty() {
        info!(bucket = %config.bucket_name, prefix = %prefix, "Folder empty or missing");
        return Ok(DeleteFolderResult {
            success: true,
            message: "Folder is empty or does not exist".to_string(),
            folder_path: prefix,
            deleted_count: 0,
            error: None,
            failed: Vec::new(),
        });
    }

    let total = keys.len();
    let concurrency = dispatcher.state().config.delete_concurrency.max(1);
    let client = &client;

    let outcomes: Vec<(String, Result<(), stowage_client::ClientError>)> = stream::iter(keys)
        .map(move |key| async move {
            let result = client.delete_object(&key).await;
            (key, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let failed: Vec<FailedDelete> = outcomes
        .into_iter()
        .filter_map(|(key, result)| {
            result.err().map(|e| {
                warn!(key = %key, error = %e, "Failed to delete object");
                FailedDelete {
                    key,
                    error: e.to_string(),
                }
            })
        })
        .collect();
    let deleted_count = total - failed.len();

    info!(
        bucket = %config.bucket_name,
        prefix = %prefix,
        deleted = deleted_count,
        failed = failed.len(),
        "Deleted folder"
    );

    if failed.is_empty() {
        Ok(DeleteFolderResult {
            success: true,
            message: format!("Folder {} deleted ({} objects)", prefix, deleted_count),
            folder_path: prefix,
            deleted_count,
            error: None,
            failed,
        })
    } else {
        Ok(DeleteFolderResult {
            success: false,
            message: format!("Folder {} partially deleted", prefix),
            error: Some(format!("Failed to delete {} of {} objects", failed.len(), total)),
            folder_path: prefix,
            deleted_count,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_key() {
        assert_eq!(marker_key("photos"), "photos/.keep");
        assert_eq!(marker_key("photos/2024/"), "photos/2024/.keep");
    }
}
