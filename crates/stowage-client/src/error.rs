//! Client error types

use serde::Deserialize;
use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Transport-level failure kinds that are worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// Peer reset or aborted the connection
    ConnectionReset,
    /// Connect or request deadline elapsed
    TimedOut,
    /// Host name could not be resolved
    NameResolution,
    /// Any other failure to reach the backend
    Networking,
}

impl NetworkFailure {
    /// Stable code, matching the names surfaced to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::TimedOut => "ETIMEDOUT",
            Self::NameResolution => "ENOTFOUND",
            Self::Networking => "NetworkingError",
        }
    }
}

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (reset, timeout, DNS, refused connection)
    #[error("Network error ({}): {message}", .kind.code())]
    Network {
        kind: NetworkFailure,
        message: String,
    },

    /// HTTP request error that is not a transport failure
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// S3 API error
    #[error("S3 error ({code}): {message}")]
    S3Error {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// Object key that cannot be addressed without the URL rewriting it
    #[error("Invalid object key '{0}': '.' and '..' path segments are not addressable")]
    InvalidKey(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

impl ClientError {
    /// Parse an S3 error from an XML response body
    pub fn from_s3_xml(xml: &str, status: u16) -> Self {
        let body: ErrorBody = quick_xml::de::from_str(xml).unwrap_or_default();

        let code = body.code.unwrap_or_else(|| match status {
            403 => "AccessDenied".to_string(),
            404 => "NotFound".to_string(),
            _ => format!("HTTP{}", status),
        });

        Self::S3Error {
            status,
            code,
            message: body.message.unwrap_or_else(|| "Unknown error".to_string()),
            request_id: body.request_id,
        }
    }

    /// Backend error code, when one is known
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Network { kind, .. } => Some(kind.code()),
            Self::S3Error { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Failure text reported by the backend or transport, without the
    /// request URL. `None` for errors raised locally.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Network { message, .. } => Some(message.clone()),
            Self::Http(err) => err.source().map(error_chain),
            Self::S3Error { message, .. } => Some(message.clone()),
            Self::XmlParse(message) | Self::InvalidResponse(message) => Some(message.clone()),
            Self::Config(_) | Self::InvalidKey(_) => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::S3Error { code, .. } if code == "NoSuchKey" || code == "NoSuchBucket" || code == "NotFound")
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match network_failure(&err) {
            Some(kind) => ClientError::Network {
                kind,
                message: error_chain(&err),
            },
            None => ClientError::Http(err),
        }
    }
}

/// Walk the source chain looking for a transport failure
fn network_failure(err: &reqwest::Error) -> Option<NetworkFailure> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe => return Some(NetworkFailure::ConnectionReset),
                std::io::ErrorKind::TimedOut => return Some(NetworkFailure::TimedOut),
                _ => {}
            }
        }

        let text = e.to_string().to_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
        {
            return Some(NetworkFailure::NameResolution);
        }
        source = e.source();
    }

    if err.is_timeout() {
        Some(NetworkFailure::TimedOut)
    } else if err.is_connect() || err.is_request() {
        Some(NetworkFailure::Networking)
    } else {
        None
    }
}

/// Render an error with all of its sources, `outer: inner: root`
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        let text = e.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = e.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_error() {
        let xml = r#"<?xml version="1.0"?>
<Error>
    <Code>SignatureDoesNotMatch</Code>
    <Message>The request signature we calculated does not match the signature you provided.</Message>
    <RequestId>abc123</RequestId>
</Error>"#;

        let error = ClientError::from_s3_xml(xml, 403);

        match error {
            ClientError::S3Error { status, code, message, request_id } => {
                assert_eq!(status, 403);
                assert_eq!(code, "SignatureDoesNotMatch");
                assert!(message.starts_with("The request signature"));
                assert_eq!(request_id, Some("abc123".to_string()));
            }
            _ => panic!("Expected S3Error"),
        }
    }

    #[test]
    fn test_empty_body_falls_back_to_status() {
        let error = ClientError::from_s3_xml("", 404);
        assert_eq!(error.code(), Some("NotFound"));
        assert!(error.is_not_found());

        let error = ClientError::from_s3_xml("", 502);
        assert_eq!(error.code(), Some("HTTP502"));
    }

    #[test]
    fn test_network_display_includes_code() {
        let error = ClientError::Network {
            kind: NetworkFailure::ConnectionReset,
            message: "connection reset by peer".to_string(),
        };
        assert_eq!(error.to_string(), "Network error (ECONNRESET): connection reset by peer");
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();

        let error = ClientError::from(err);
        assert!(matches!(error, ClientError::Network { .. }), "got {:?}", error);
    }
}
