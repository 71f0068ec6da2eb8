//! Error types and gateway error codes

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use strum::{AsRefStr, IntoStaticStr};
use stowage_client::{describe, ClientError, ErrorClass, ErrorDescriptor};
use thiserror::Error;

/// Gateway error codes reported in `errorCode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
pub enum ErrorCode {
    /// A required credential, bucket or endpoint is missing
    ConfigIncomplete,
    /// An action-specific input is missing
    MissingParameter,
    /// Unrecognized action identifier
    InvalidAction,
    /// Reset, timeout or DNS failure that outlived the retry budget
    TransientNetwork,
    /// Credential pairing or endpoint problem
    SignatureMismatch,
    /// Backend answered with a failure while proxying
    UpstreamFailure,
    /// Any other failure
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl From<ErrorClass> for ErrorCode {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::TransientNetwork => Self::TransientNetwork,
            ErrorClass::SignatureMismatch => Self::SignatureMismatch,
            ErrorClass::Permanent => Self::Unknown,
        }
    }
}

/// Action API error
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Incomplete configuration, please provide access key id, secret key, bucket name and endpoint")]
    ConfigIncomplete,

    #[error("Missing {0}")]
    MissingParameter(&'static str),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("{}", .0.message)]
    Backend(ErrorDescriptor),
}

impl ApiError {
    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConfigIncomplete => ErrorCode::ConfigIncomplete,
            Self::MissingParameter(_) => ErrorCode::MissingParameter,
            Self::InvalidAction(_) => ErrorCode::InvalidAction,
            Self::Backend(descriptor) => descriptor.class.into(),
        }
    }

    /// JSON envelope for this error
    pub fn body(&self) -> ErrorBody {
        let (suggestion, backend_code) = match self {
            Self::Backend(descriptor) => (
                descriptor.suggestion,
                Some(descriptor.code.clone()).filter(|c| c != "UNKNOWN"),
            ),
            _ => (None, None),
        };

        ErrorBody {
            success: false,
            error: self.to_string(),
            error_code: self.error_code().as_str(),
            suggestion,
            backend_code,
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self::Backend(describe(&err))
    }
}

/// `{success:false, ...}` envelope returned by the action API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Callers inspect `success`, not the status
        (StatusCode::OK, Json(self.body())).into_response()
    }
}

/// Reverse proxy failure
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("No backend endpoint configured")]
    NoEndpoint,

    #[error("Request failed: {status}")]
    Upstream { status: StatusCode },

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("{0}")]
    Transport(String),
}

impl ProxyError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoEndpoint => ErrorCode::ConfigIncomplete,
            _ => ErrorCode::UpstreamFailure,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(ClientError::from(err).to_string())
    }
}

/// Which proxy branch failed, with the context echoed back to the caller
#[derive(Debug)]
pub enum ProxyFailure {
    Image {
        error: ProxyError,
        url: String,
    },
    Generic {
        error: ProxyError,
        path: String,
        target_url: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyErrorBody<'a> {
    error: &'static str,
    message: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<&'a str>,
}

impl IntoResponse for ProxyFailure {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::Image { error, url } => ProxyErrorBody {
                error: "Image preview failed",
                message: error.to_string(),
                error_code: error.error_code().as_str(),
                url: Some(url),
                path: None,
                target_url: None,
            },
            Self::Generic {
                error,
                path,
                target_url,
            } => ProxyErrorBody {
                error: "Proxy request failed",
                message: error.to_string(),
                error_code: error.error_code().as_str(),
                url: None,
                path: Some(path),
                target_url: Some(target_url),
            },
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(body),
        )
            .into_response()
    }
}
