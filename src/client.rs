//! HTTP client construction and guarded response reads.
//!
//! The guards run before a body ever reaches a parser: expected status
//! code, Atom content type, a 10 MB streaming size cap, and UTF-8
//! validation. Transport-level policy beyond that (retries, caching)
//! deliberately does not exist; failures surface to the caller.
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::service::ServiceError;

/// Media type the Blogs API speaks for feeds and entries.
pub const ATOM_MEDIA_TYPE: &str = "application/atom+xml";

/// Response bodies above this are rejected to bound memory.
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Builds the shared client with a default `Accept` header for Atom.
/// Per-request timeouts are applied by the service via
/// `tokio::time::timeout`.
pub(crate) fn build_client() -> Result<reqwest::Client, ServiceError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ATOM_MEDIA_TYPE));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(ServiceError::Transport)
}

/// Validates status and content type, then reads the body through the
/// size-capped streaming reader and decodes it as UTF-8.
pub(crate) async fn read_atom_body(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<String, ServiceError> {
    let status = response.status();
    if status != expected {
        // 401/403/404 land here as caller errors; the body often carries
        // the server's diagnostic text.
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with(ATOM_MEDIA_TYPE) {
        return Err(ServiceError::UnexpectedContentType(content_type));
    }

    let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
    String::from_utf8(bytes).map_err(|_| ServiceError::InvalidUtf8)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ServiceError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ServiceError::ResponseTooLarge(len as usize));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ServiceError::Transport)?;
        let total = bytes.len().saturating_add(chunk.len());
        if total > limit {
            return Err(ServiceError::ResponseTooLarge(total));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
