//! Configuration and connectivity actions

use super::ActionDispatcher;
use crate::error::ApiError;
use crate::resolver::{DefaultConfigView, EffectiveConfig};
use crate::AppState;
use serde::Serialize;
use stowage_client::{ListObjectsOptions, ObjectStore};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct DefaultConfigResult {
    pub success: bool,
    pub config: DefaultConfigView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResult {
    pub success: bool,
    pub message: String,
    /// Outcome of the connectivity probe; absent when the probe is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_reachable: Option<bool>,
}

/// getDefaultConfig - Environment defaults with the secret masked
pub fn default_config(state: &AppState) -> DefaultConfigResult {
    DefaultConfigResult {
        success: true,
        config: DefaultConfigView::from(&state.defaults),
    }
}

/// testConnection - Probe the network, then list a single key
pub async fn test_connection(
    dispatcher: &ActionDispatcher<'_>,
    config: &EffectiveConfig,
) -> Result<ConnectionResult, ApiError> {
    let client = dispatcher.client(config)?;

    let network_reachable = match &dispatcher.state().probe {
        Some(probe) => {
            let reachable = probe.probe().await;
            if !reachable {
                warn!("Connectivity probe failed, testing backend anyway");
            }
            Some(reachable)
        }
        None => None,
    };

    client
        .list_objects(&ListObjectsOptions::default().max_keys(1))
        .await?;

    info!(bucket = %config.bucket_name, "Connection test succeeded");
    Ok(ConnectionResult {
        success: true,
        message: format!("Connected to bucket \"{}\"", config.bucket_name),
        network_reachable,
    })
}
