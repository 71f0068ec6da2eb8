//! Reverse proxy to the storage backend
//!
//! Requests under the proxy prefix are forwarded to the backend root with
//! the prefix removed. Image paths take a dedicated branch that buffers the
//! body and rewrites headers for inline, cacheable previews; everything else
//! is relayed as-is with permissive CORS headers.

use crate::error::{ProxyError, ProxyFailure};
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Suffixes served by the image branch
pub const IMAGE_SUFFIXES: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];

/// One year
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Headers that describe a single connection and are never relayed
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// True when the path names an image file
pub fn is_image_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_SUFFIXES.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Headers copied from the backend onto image responses
fn is_image_metadata(name: &HeaderName) -> bool {
    name.as_str().starts_with("x-amz-")
        || *name == header::ETAG
        || *name == header::LAST_MODIFIED
}

fn set_cors(headers: &mut HeaderMap, methods: &'static str) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(methods));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("*"));
}

/// Target URL for a backend path (`/bucket/key`) and raw query
pub fn target_url(root: &str, path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}{}?{}", root, path, q),
        _ => format!("{}{}", root, path),
    }
}

/// ANY {proxy_prefix}/{*path} - Forward to the backend
pub async fn proxy_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let path = request
        .uri()
        .path()
        .strip_prefix(state.config.proxy_prefix())
        .unwrap_or_default()
        .to_string();
    let query = request.uri().query().map(str::to_string);
    let image = is_image_path(&path);

    let target = state
        .proxy_root()
        .map(|root| target_url(&root, &path, query.as_deref()));

    let result = match &target {
        None => Err(ProxyError::NoEndpoint),
        Some(target) if image => {
            debug!(path = %path, "Image preview request");
            info!(target = %target, "Proxying image preview");
            forward_image(&state, target).await
        }
        Some(target) => {
            info!(method = %request.method(), target = %target, "Proxying request");
            forward(&state, target, request).await
        }
    };

    result.unwrap_or_else(|error| {
        let target = target.unwrap_or_default();
        warn!(path = %path, target = %target, error = %error, "Proxy request failed");
        if image {
            ProxyFailure::Image { error, url: target }.into_response()
        } else {
            ProxyFailure::Generic {
                error,
                path,
                target_url: target,
            }
            .into_response()
        }
    })
}

/// Fetch an image and serve it inline with long-lived caching
async fn forward_image(state: &AppState, target: &str) -> Result<Response, ProxyError> {
    let url = Url::parse(target).map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;

    let upstream = state
        .http
        .get(url)
        .header(header::ACCEPT, "image/*")
        .send()
        .await?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(ProxyError::Upstream { status });
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    if !content_type.as_bytes().starts_with(b"image/") {
        warn!(target = %target, content_type = ?content_type, "Proxied resource is not an image");
    }

    let metadata: Vec<(HeaderName, HeaderValue)> = upstream
        .headers()
        .iter()
        .filter(|(name, _)| is_image_metadata(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let body = upstream.bytes().await?;

    let mut response = Response::new(Body::from(body.clone()));
    let headers = response.headers_mut();
    for (name, value) in metadata {
        headers.append(name, value);
    }
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    set_cors(headers, "GET, HEAD, OPTIONS");

    debug!(bytes = body.len(), "Image preview served");
    Ok(response)
}

/// Relay a request verbatim, host rewritten, and mirror the backend response
async fn forward(state: &AppState, target: &str, request: Request) -> Result<Response, ProxyError> {
    let url = Url::parse(target).map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(ProxyError::InvalidTarget(target.to_string())),
    };

    let (parts, body) = request.into_parts();

    let mut headers = HeaderMap::with_capacity(parts.headers.len());
    for (name, value) in parts.headers.iter() {
        if is_hop_by_hop(name) || *name == header::HOST || *name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    if let Ok(value) = HeaderValue::from_str(&host) {
        headers.insert(header::HOST, value);
    }

    let mut builder = state.http.request(parts.method.clone(), url).headers(headers);
    if parts.method != Method::GET && parts.method != Method::HEAD {
        let body = to_bytes(body, state.config.max_body_size)
            .await
            .map_err(|e| ProxyError::Body(e.to_string()))?;
        builder = builder.body(body);
    }

    let upstream = builder.send().await?;
    let status = upstream.status();

    let mut response_headers = HeaderMap::new();
    set_cors(&mut response_headers, "GET, PUT, POST, DELETE, HEAD, OPTIONS");
    response_headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    for (name, value) in upstream.headers().iter() {
        if name.as_str().starts_with("access-control-") || is_hop_by_hop(name) {
            continue;
        }
        response_headers.append(name.clone(), value.clone());
    }

    let body = upstream.bytes().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "Upstream responded");

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/bucket/cat.png", true)]
    #[case("/bucket/CAT.JPG", true)]
    #[case("/bucket/a.b/photo.webp", true)]
    #[case("/bucket/icon.svg", true)]
    #[case("/bucket/doc.pdf", false)]
    #[case("/bucket/png", false)]
    #[case("/bucket/archive.png.zip", false)]
    fn test_is_image_path(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_image_path(path), expected);
    }

    #[test]
    fn test_target_url() {
        assert_eq!(
            target_url("https://r2.example.com", "/bucket/a.txt", Some("x-id=GetObject")),
            "https://r2.example.com/bucket/a.txt?x-id=GetObject"
        );
        assert_eq!(
            target_url("https://r2.example.com", "/bucket/a.txt", Some("")),
            "https://r2.example.com/bucket/a.txt"
        );
    }

    #[test]
    fn test_metadata_filter() {
        assert!(is_image_metadata(&HeaderName::from_static("x-amz-meta-author")));
        assert!(is_image_metadata(&header::ETAG));
        assert!(!is_image_metadata(&header::SERVER));
    }
}
