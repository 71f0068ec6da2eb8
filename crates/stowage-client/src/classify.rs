//! Failure classification
//!
//! Decides whether a failed backend call is worth retrying. Only transport
//! trouble is retried; credential and request errors fail fast.

use crate::{ClientError, NetworkFailure};

/// Backend codes that indicate a credential/endpoint pairing problem
const SIGNATURE_CODES: &[&str] = &[
    "SignatureDoesNotMatch",
    "InvalidAccessKeyId",
    "InvalidSignature",
    "AuthorizationHeaderMalformed",
];

/// Codes recognized as network failures regardless of how they surfaced
const NETWORK_CODES: &[&str] = &[
    "ECONNRESET",
    "ETIMEDOUT",
    "ENOTFOUND",
    "EAI_AGAIN",
    "NetworkingError",
];

/// Keywords in a failure message that mark it as a network problem
const NETWORK_KEYWORDS: &[&str] = &["network", "timeout", "timed out", "connection"];

/// Coarse failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Reset, timeout or DNS trouble; retryable
    TransientNetwork,
    /// Credential pairing or endpoint malformed; not retryable
    SignatureMismatch,
    /// Anything else; not retryable
    Permanent,
}

impl ErrorClass {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork)
    }
}

/// Normalized description of a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub class: ErrorClass,
    /// Backend or transport code, `UNKNOWN` when none is available
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Suggested remediation, when one is known
    pub suggestion: Option<&'static str>,
}

/// Classify a failure
pub fn classify(error: &ClientError) -> ErrorClass {
    if let ClientError::Network { .. } = error {
        return ErrorClass::TransientNetwork;
    }

    if let Some(code) = error.code() {
        if SIGNATURE_CODES.contains(&code) {
            return ErrorClass::SignatureMismatch;
        }
        if NETWORK_CODES.contains(&code) {
            return ErrorClass::TransientNetwork;
        }
    }

    let message = match error.detail() {
        Some(detail) => detail.to_lowercase(),
        None => return ErrorClass::Permanent,
    };
    if NETWORK_KEYWORDS.iter().any(|k| message.contains(k)) {
        ErrorClass::TransientNetwork
    } else {
        ErrorClass::Permanent
    }
}

/// Classify a failure and attach a message and remediation hint
pub fn describe(error: &ClientError) -> ErrorDescriptor {
    let class = classify(error);
    let code = error.code().unwrap_or("UNKNOWN").to_string();

    let (message, suggestion) = match error {
        ClientError::Network { kind: NetworkFailure::ConnectionReset, .. } => (
            "Connection was reset (ECONNRESET)".to_string(),
            Some("This is usually caused by network trouble, an intercepting proxy or a firewall. Check the network settings or try a different network."),
        ),
        ClientError::Network { kind: NetworkFailure::NameResolution, .. } => (
            "Could not resolve the server address".to_string(),
            Some("Check that the endpoint URL is correct and that DNS resolution works."),
        ),
        ClientError::Network { kind: NetworkFailure::TimedOut, .. } => (
            "The storage backend did not respond in time".to_string(),
            Some("Check connectivity to the endpoint and retry later."),
        ),
        _ if class == ErrorClass::SignatureMismatch => (
            "Signature verification failed".to_string(),
            Some("Make sure the access key and secret key belong together and check the endpoint URL format."),
        ),
        _ => (error.to_string(), None),
    };

    ErrorDescriptor {
        class,
        code,
        message,
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn s3(code: &str, message: &str) -> ClientError {
        ClientError::S3Error {
            status: 400,
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        }
    }

    #[rstest]
    #[case(NetworkFailure::ConnectionReset)]
    #[case(NetworkFailure::TimedOut)]
    #[case(NetworkFailure::NameResolution)]
    #[case(NetworkFailure::Networking)]
    fn test_network_failures_are_transient(#[case] kind: NetworkFailure) {
        let error = ClientError::Network {
            kind,
            message: "boom".to_string(),
        };
        assert_eq!(classify(&error), ErrorClass::TransientNetwork);
    }

    #[rstest]
    #[case("SignatureDoesNotMatch")]
    #[case("InvalidAccessKeyId")]
    fn test_signature_errors_fail_fast(#[case] code: &str) {
        let error = s3(code, "The request signature we calculated does not match");
        assert_eq!(classify(&error), ErrorClass::SignatureMismatch);
        assert!(!classify(&error).is_transient());
    }

    #[rstest]
    #[case("RequestTimeout", "Your socket connection to the server was not read from", ErrorClass::TransientNetwork)]
    #[case("InternalError", "We encountered a network hiccup", ErrorClass::TransientNetwork)]
    #[case("NoSuchBucket", "The specified bucket does not exist", ErrorClass::Permanent)]
    #[case("InvalidArgument", "Invalid argument", ErrorClass::Permanent)]
    fn test_message_keywords(#[case] code: &str, #[case] message: &str, #[case] expected: ErrorClass) {
        assert_eq!(classify(&s3(code, message)), expected);
    }

    #[test]
    fn test_config_errors_are_permanent() {
        let error = ClientError::Config("invalid endpoint 'htp:/x': connection string".to_string());
        assert_eq!(classify(&error), ErrorClass::Permanent);
    }

    #[test]
    fn test_invalid_key_is_permanent() {
        let error = ClientError::InvalidKey("network/../timeout.txt".to_string());
        assert_eq!(classify(&error), ErrorClass::Permanent);
    }

    #[tokio::test]
    async fn test_endpoint_host_does_not_look_transient() {
        use wiremock::{matchers::any, Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/mynetwork-connection-timeout"),
            )
            .mount(&server)
            .await;

        // Redirect loops surface as non-transport HTTP errors whose text carries the URL
        let url = format!("{}/mynetwork-connection-timeout", server.uri());
        let err = reqwest::Client::new().get(&url).send().await.unwrap_err();
        let error = ClientError::from(err);
        assert!(matches!(error, ClientError::Http(_)), "got {:?}", error);
        assert!(error.to_string().contains("mynetwork-connection-timeout"));
        assert_eq!(classify(&error), ErrorClass::Permanent);
    }

    #[test]
    fn test_describe_connection_reset() {
        let descriptor = describe(&ClientError::Network {
            kind: NetworkFailure::ConnectionReset,
            message: "connection reset by peer".to_string(),
        });
        assert_eq!(descriptor.code, "ECONNRESET");
        assert!(descriptor.class.is_transient());
        assert!(descriptor.suggestion.unwrap().contains("firewall"));
    }

    #[test]
    fn test_describe_signature_mismatch() {
        let descriptor = describe(&s3("SignatureDoesNotMatch", "bad"));
        assert_eq!(descriptor.class, ErrorClass::SignatureMismatch);
        assert_eq!(descriptor.message, "Signature verification failed");
        assert!(descriptor.suggestion.is_some());
    }

    #[test]
    fn test_describe_unknown_passthrough() {
        let descriptor = describe(&ClientError::InvalidResponse("garbage".to_string()));
        assert_eq!(descriptor.class, ErrorClass::Permanent);
        assert_eq!(descriptor.code, "UNKNOWN");
        assert_eq!(descriptor.message, "Invalid response: garbage");
        assert!(descriptor.suggestion.is_none());
    }
}
