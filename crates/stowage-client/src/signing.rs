//! AWS Signature Version 4 for S3-compatible backends
//!
//! Two flavours are supported:
//! - header signing, used for live requests issued by [`crate::S3Client`]
//! - query presigning, used for time-limited signed references handed to
//!   browsers for direct upload/download

use crate::config::BackendConfig;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash placeholder for presigned requests
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

const SERVICE: &str = "s3";

/// Headers to attach to a signed request
#[derive(Clone, Debug)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

/// Request signer bound to one credential pair and region
#[derive(Clone)]
pub struct Signer {
    access_key_id: String,
    secret_key: SecretString,
    region: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_key: SecretString,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key,
            region: region.into(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(
            config.access_key_id.clone(),
            config.secret_key.clone(),
            config.region.clone(),
        )
    }

    /// Sign a request with the `Authorization` header.
    ///
    /// `extra_headers` are additional (lowercase) headers that must be
    /// covered by the signature; `host`, `x-amz-date` and
    /// `x-amz-content-sha256` are always signed.
    pub fn sign_headers(
        &self,
        method: &str,
        url: &Url,
        extra_headers: &[(&str, &str)],
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> SignedHeaders {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = self.scope(&date);

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host_header(url)),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        headers.extend(
            extra_headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string())),
        );
        headers.sort();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let canonical_request = canonical_request(method, url.path(), &pairs, &headers, payload_hash);
        let signature = self.signature(&date, &amz_date, &scope, &canonical_request);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.access_key_id,
            scope,
            signed_header_names(&headers),
            signature
        );

        SignedHeaders {
            authorization,
            amz_date,
            content_sha256: payload_hash.to_string(),
        }
    }

    /// Produce a presigned URL valid for `expires_in_secs`.
    ///
    /// `signed_headers` must be sent verbatim by whoever uses the URL.
    pub fn presign(
        &self,
        method: &str,
        url: &Url,
        expires_in_secs: u64,
        signed_headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> Url {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = self.scope(&date);

        let mut headers: Vec<(String, String)> = vec![("host".to_string(), host_header(url))];
        headers.extend(
            signed_headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string())),
        );
        headers.sort();
        let header_names = signed_header_names(&headers);

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        pairs.push(("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()));
        pairs.push((
            "X-Amz-Credential".to_string(),
            format!("{}/{}", self.access_key_id, scope),
        ));
        pairs.push(("X-Amz-Date".to_string(), amz_date.clone()));
        pairs.push(("X-Amz-Expires".to_string(), expires_in_secs.to_string()));
        pairs.push(("X-Amz-SignedHeaders".to_string(), header_names));

        let canonical_request =
            canonical_request(method, url.path(), &pairs, &headers, UNSIGNED_PAYLOAD);
        let signature = self.signature(&date, &amz_date, &scope, &canonical_request);

        let query = format!("{}&X-Amz-Signature={}", canonical_query(&pairs), signature);
        let mut signed = url.clone();
        signed.set_query(Some(&query));
        signed
    }

    fn scope(&self, date: &str) -> String {
        format!("{}/{}/{}/aws4_request", date, self.region, SERVICE)
    }

    fn signature(&self, date: &str, amz_date: &str, scope: &str, canonical_request: &str) -> String {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let secret = format!("AWS4{}", self.secret_key.expose_secret());
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()))
    }
}

fn canonical_request(
    method: &str,
    path: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        if path.is_empty() { "/" } else { path },
        canonical_query(query),
        canonical_headers,
        signed_header_names(headers),
        payload_hash
    )
}

fn canonical_query(pairs: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
        .collect();
    encoded.sort();
    encoded
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// `host[:port]` as it appears on the wire
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// RFC 3986 encoding as required by SigV4; `/` is kept when `encode_slash`
/// is false so object keys keep their path structure.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    if encode_slash {
        urlencoding::encode(input).into_owned()
    } else {
        input
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Hex-encoded SHA-256
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
