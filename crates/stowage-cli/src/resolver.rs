//! Per-request configuration resolution
//!
//! Request-supplied values win over environment defaults field by field.

use crate::config::StorageDefaults;
use crate::error::ApiError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stowage_client::BackendConfig;
use tracing::warn;

/// Mask shown for secrets too short to partially reveal
pub const SHORT_SECRET_MASK: &str = "********";

/// Optional JSON body accepted by every action
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionBody {
    pub access_key_id: Option<String>,
    pub secret_key: Option<String>,
    pub bucket_name: Option<String>,
    pub endpoint: Option<String>,
    pub prefix: Option<String>,
    pub file_name: Option<String>,
    pub folder_path: Option<String>,
    pub content_type: Option<String>,
}

impl std::fmt::Debug for ActionBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBody")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[redacted]"))
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("file_name", &self.file_name)
            .field("folder_path", &self.folder_path)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl ActionBody {
    /// Parse a request body. Anything that is not JSON counts as `{}`; in an
    /// object whose fields do not all deserialize, the string fields are kept.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Request body is not JSON, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_value(value.clone()) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Request body has mistyped fields, keeping string fields only");
                Self::from_string_fields(&value)
            }
        }
    }

    fn from_string_fields(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            access_key_id: field("accessKeyId"),
            secret_key: field("secretKey"),
            bucket_name: field("bucketName"),
            endpoint: field("endpoint"),
            prefix: field("prefix"),
            file_name: field("fileName"),
            folder_path: field("folderPath"),
            content_type: field("contentType"),
        }
    }
}

/// Credentials, endpoint and action inputs for one request
#[derive(Clone)]
pub struct EffectiveConfig {
    pub access_key_id: String,
    pub secret_key: SecretString,
    pub bucket_name: String,
    pub endpoint: String,
    pub prefix: Option<String>,
    pub file_name: Option<String>,
    pub folder_path: Option<String>,
    pub content_type: Option<String>,
}

impl std::fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("access_key_id", &self.access_key_id)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("file_name", &self.file_name)
            .field("folder_path", &self.folder_path)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Merge a request body over the environment defaults. Never fails; missing
/// values stay empty.
pub fn resolve(body: &ActionBody, defaults: &StorageDefaults) -> EffectiveConfig {
    let pick = |value: &Option<String>, fallback: &str| {
        non_empty(value).unwrap_or_else(|| fallback.to_string())
    };

    EffectiveConfig {
        access_key_id: pick(&body.access_key_id, &defaults.access_key_id),
        secret_key: SecretString::from(pick(
            &body.secret_key,
            defaults.secret_key.expose_secret(),
        )),
        bucket_name: pick(&body.bucket_name, &defaults.bucket_name),
        endpoint: pick(&body.endpoint, &defaults.endpoint),
        prefix: non_empty(&body.prefix),
        file_name: non_empty(&body.file_name),
        folder_path: non_empty(&body.folder_path),
        content_type: non_empty(&body.content_type),
    }
}

impl EffectiveConfig {
    /// True when every value needed for a backend call is present
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty()
            && !self.secret_key.expose_secret().is_empty()
            && !self.bucket_name.is_empty()
            && !self.endpoint.is_empty()
    }

    pub fn require_complete(&self) -> Result<(), ApiError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(ApiError::ConfigIncomplete)
        }
    }

    pub fn require_file_name(&self) -> Result<&str, ApiError> {
        self.file_name
            .as_deref()
            .ok_or(ApiError::MissingParameter("file name"))
    }

    pub fn require_folder_path(&self) -> Result<&str, ApiError> {
        self.folder_path
            .as_deref()
            .ok_or(ApiError::MissingParameter("folder path"))
    }

    /// Backend connection settings for this request
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(
            self.endpoint.clone(),
            self.bucket_name.clone(),
            self.access_key_id.clone(),
            self.secret_key.expose_secret().to_string(),
        )
    }
}

/// Display-safe form of a secret: first and last four characters kept for
/// secrets longer than eight characters, a fixed mask otherwise.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return SHORT_SECRET_MASK.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

/// Environment defaults as reported by `getDefaultConfig`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConfigView {
    pub access_key_id: String,
    pub secret_key: String,
    pub bucket_name: String,
    pub endpoint: String,
    pub has_config: bool,
}

impl From<&StorageDefaults> for DefaultConfigView {
    fn from(defaults: &StorageDefaults) -> Self {
        let secret = defaults.secret_key.expose_secret();
        Self {
            access_key_id: defaults.access_key_id.clone(),
            secret_key: if secret.is_empty() {
                String::new()
            } else {
                mask_secret(secret)
            },
            bucket_name: defaults.bucket_name.clone(),
            endpoint: defaults.endpoint.clone(),
            has_config: defaults.has_config(),
        }
    }
}
