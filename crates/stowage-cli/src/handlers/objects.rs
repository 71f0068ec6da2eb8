//! Object listing and deletion

use super::{folder_prefix, ActionDispatcher};
use crate::error::ApiError;
use crate::resolver::EffectiveConfig;
use serde::Serialize;
use stowage_client::{ObjectDescriptor, ObjectStore};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub success: bool,
    /// Entries exactly as the backend reported them, in backend order
    pub objects: Vec<ObjectDescriptor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub success: bool,
    pub message: String,
    pub file_name: String,
}

/// list - Every object, optionally under a folder prefix
pub async fn list(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<ListResult, ApiError> {
    let client = dispatcher.client(config)?;
    let prefix = config.prefix.as_deref().map(folder_prefix);

    let objects = client.list_all(prefix.as_deref()).await?;

    info!(bucket = %config.bucket_name, prefix = ?prefix, count = objects.len(), "Listed objects");
    Ok(ListResult {
        success: true,
        objects,
    })
}

/// delete - Remove a single object
pub async fn delete(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<DeleteResult, ApiError> {
    let file_name = config.require_file_name()?;
    let client = dispatcher.client(config)?;

    client.delete_object(file_name).await?;

    info!(bucket = %config.bucket_name, key = %file_name, "Deleted object");
    Ok(DeleteResult {
        success: true,
        message: format!("File {} deleted", file_name),
        file_name: file_name.to_string(),
    })
}
