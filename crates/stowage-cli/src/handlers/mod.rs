//! Action API handlers
//!
//! One endpoint, many operations: the `action` query parameter selects an
//! [`Action`] and [`ActionDispatcher`] runs it against a backend built from
//! the resolved per-request configuration.

pub mod connection;
pub mod folders;
pub mod objects;
pub mod urls;

pub use connection::*;
pub use folders::*;
pub use objects::*;
pub use urls::*;

use crate::actions::Action;
use crate::error::ApiError;
use crate::resolver::{resolve, ActionBody, EffectiveConfig};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stowage_client::RetryingClient;
use tracing::{info, warn};

/// Successful (or partially successful) action outcome
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    DefaultConfig(DefaultConfigResult),
    Connection(ConnectionResult),
    List(ListResult),
    FolderCreated(CreateFolderResult),
    UploadUrl(UploadUrlResult),
    DownloadUrl(DownloadUrlResult),
    Deleted(DeleteResult),
    FolderDeleted(DeleteFolderResult),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        match self {
            Self::DefaultConfig(r) => r.success,
            Self::Connection(r) => r.success,
            Self::List(r) => r.success,
            Self::FolderCreated(r) => r.success,
            Self::UploadUrl(r) => r.success,
            Self::DownloadUrl(r) => r.success,
            Self::Deleted(r) => r.success,
            Self::FolderDeleted(r) => r.success,
        }
    }
}

/// Runs actions against the backend described by each request
pub struct ActionDispatcher<'a> {
    state: &'a AppState,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Validate inputs, then run `action`. Validation failures never reach
    /// the backend.
    pub async fn handle(&self, action: Action, body: &ActionBody) -> Result<ActionResult, ApiError> {
        if !action.needs_backend() {
            return Ok(ActionResult::DefaultConfig(default_config(self.state)));
        }

        let config = resolve(body, &self.state.defaults);
        config.require_complete()?;

        let result = match action {
            Action::GetDefaultConfig => ActionResult::DefaultConfig(default_config(self.state)),
            Action::TestConnection => {
                ActionResult::Connection(test_connection(self, &config).await?)
            }
            Action::List => ActionResult::List(list(self, &config).await?),
            Action::CreateFolder => {
                ActionResult::FolderCreated(create_folder(self, &config).await?)
            }
            Action::GetUploadUrl => ActionResult::UploadUrl(upload_url(self, &config).await?),
            Action::GetDownloadUrl => {
                ActionResult::DownloadUrl(download_url(self, &config).await?)
            }
            Action::Delete => ActionResult::Deleted(delete(self, &config).await?),
            Action::DeleteFolder => {
                ActionResult::FolderDeleted(delete_folder(self, &config).await?)
            }
        };

        Ok(result)
    }

    pub(crate) fn state(&self) -> &AppState {
        self.state
    }

    /// Retrying client for this request's backend
    pub(crate) fn client(&self, config: &EffectiveConfig) -> Result<RetryingClient, ApiError> {
        Ok(self.state.client(config)?)
    }
}

/// Query string of the action endpoint
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

/// GET|POST {api_path}?action=... - Run an action
pub async fn action_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
    body: Bytes,
) -> Response {
    let action = match Action::parse(query.action.as_deref()) {
        Ok(action) => action,
        Err(e) => {
            warn!(action = ?query.action, "Invalid action");
            return e.into_response();
        }
    };

    let body = ActionBody::from_bytes(&body);
    match ActionDispatcher::new(&state).handle(action, &body).await {
        Ok(result) => {
            info!(action = %action, success = result.is_success(), "Action completed");
            Json(result).into_response()
        }
        Err(e) => {
            warn!(action = %action, error_code = e.error_code().as_str(), error = %e, "Action failed");
            e.into_response()
        }
    }
}

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ensure a non-empty folder path ends with `/`
pub(crate) fn folder_prefix(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
