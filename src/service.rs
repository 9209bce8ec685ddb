//! `BlogsService`: thin orchestration over the HTTP client and the
//! response parsers.
//!
//! One request/response exchange per logical operation, no internal
//! retries or batching. The service only assembles URLs, attaches
//! credentials, guards the response, and hands the body to the parser.
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::client::{self, ATOM_MEDIA_TYPE};
use crate::config::BlogsConfig;
use crate::response::{self, ParseError, Post, PostFeed};
use crate::xml::write::entry_document;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the service façade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configured base URL is empty or not parseable.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Response status differed from the one the operation expects
    /// (200 for reads, 201 for create). 401/403/404 are caller errors.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Response content type was not `application/atom+xml`.
    #[error("Unexpected content-type '{0}'")]
    UnexpectedContentType(String),

    /// Response body exceeded the 10 MB size limit.
    #[error("Response too large: {0} bytes")]
    ResponseTooLarge(usize),

    /// Response body was not valid UTF-8.
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,

    /// The entry payload for a create could not be serialized.
    #[error("Failed to build entry document: {0}")]
    EntryBody(String),

    /// The guarded body failed to parse as a feed or entry.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

// ============================================================================
// Request Types
// ============================================================================

/// Query options for [`BlogsService::get_posts`]. Only the whitelisted
/// parameters below are ever sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    /// 1-based page index; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to the configured `page_size`. The server
    /// caps this at 50.
    pub ps: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Comma-separated tag filter.
    pub tags: Option<String>,
}

/// A new post to create via [`BlogsService::create_post`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    /// HTML body of the post.
    pub content: String,
    /// Optional HTML teaser.
    pub summary: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug)]
struct Credentials {
    username: String,
    password: SecretString,
}

// ============================================================================
// Service Façade
// ============================================================================

/// Client for one IBM Connections Blogs deployment.
#[derive(Debug)]
pub struct BlogsService {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
    page_size: u32,
}

impl BlogsService {
    /// Builds a service from configuration: normalizes the base URL
    /// (a trailing slash is appended when missing) and constructs the
    /// HTTP client with its Atom `Accept` default.
    pub fn new(config: BlogsConfig) -> Result<Self, ServiceError> {
        if config.base_url.trim().is_empty() {
            return Err(ServiceError::InvalidBaseUrl(
                "base_url is not configured".to_string(),
            ));
        }

        let normalized = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ServiceError::InvalidBaseUrl(format!("{}: {}", normalized, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidBaseUrl(normalized));
        }

        let credentials = match (config.username, config.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username,
                password: SecretString::from(password),
            }),
            _ => {
                tracing::debug!("No credentials configured, requests will be anonymous");
                None
            }
        };

        Ok(Self {
            client: client::build_client()?,
            base_url,
            credentials,
            timeout: Duration::from_secs(config.timeout_secs),
            page_size: config.page_size,
        })
    }

    /// Fetches one page of a blog's entries.
    pub async fn get_posts(
        &self,
        handle: &str,
        query: &PostQuery,
    ) -> Result<PostFeed, ServiceError> {
        let mut url = self.endpoint(&[handle, "feed", "entries", "atom"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.unwrap_or(1).to_string());
            pairs.append_pair("ps", &query.ps.unwrap_or(self.page_size).to_string());
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(sort_by) = &query.sort_by {
                pairs.append_pair("sortBy", sort_by);
            }
            if let Some(sort_order) = &query.sort_order {
                pairs.append_pair("sortOrder", sort_order);
            }
            if let Some(tags) = &query.tags {
                pairs.append_pair("tags", tags);
            }
        }

        tracing::debug!(url = %url, "Fetching blog posts");
        let body = self.request(Method::GET, url, None).await?;
        Ok(response::parse_feed(&body)?)
    }

    /// Fetches a single entry by its short id.
    pub async fn get_post(&self, handle: &str, entry_id: &str) -> Result<Post, ServiceError> {
        let mut url = self.endpoint(&[handle, "entry", "atom"])?;
        url.query_pairs_mut().append_pair("entryid", entry_id);

        tracing::debug!(url = %url, entry_id = %entry_id, "Fetching blog post");
        let body = self.request(Method::GET, url, None).await?;
        Ok(response::parse_post(&body)?)
    }

    /// Creates a new entry and returns the server's parsed echo of it.
    pub async fn create_post(
        &self,
        handle: &str,
        draft: &PostDraft,
    ) -> Result<Post, ServiceError> {
        let url = self.endpoint(&[handle, "feed", "entries", "atom"])?;
        let payload = entry_document(draft).map_err(|e| ServiceError::EntryBody(e.to_string()))?;

        tracing::debug!(url = %url, title = %draft.title, "Creating blog post");
        let body = self.request(Method::POST, url, Some(payload)).await?;
        Ok(response::parse_post(&body)?)
    }

    /// Auth-type path segment. `basic`, `saml` and `cookie` all collapse
    /// to an empty segment on this API, which `endpoint` then skips.
    fn auth_segment(&self) -> &'static str {
        ""
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ServiceError::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            for segment in std::iter::once(self.auth_segment()).chain(segments.iter().copied()) {
                if !segment.is_empty() {
                    path.push(segment);
                }
            }
        }
        Ok(url)
    }

    /// One guarded exchange: attach basic auth when configured, wrap in
    /// the configured timeout, then validate and read the body. A POST
    /// body implies an Atom content type and a 201 expectation.
    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> Result<String, ServiceError> {
        let expected = if body.is_some() {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };

        let mut request = self.client.request(method, url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            );
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, ATOM_MEDIA_TYPE)
                .body(body);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ServiceError::Timeout)?
            .map_err(ServiceError::Transport)?;

        client::read_atom_body(response, expected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> BlogsConfig {
        BlogsConfig {
            base_url: base_url.to_string(),
            ..BlogsConfig::default()
        }
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let err = BlogsService::new(config("")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_unparseable_base_url_rejected() {
        let err = BlogsService::new(config("not a url")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_trailing_slash_appended() {
        let service = BlogsService::new(config("https://example.com/blogs")).unwrap();
        assert_eq!(service.base_url.as_str(), "https://example.com/blogs/");
    }

    #[test]
    fn test_endpoint_joins_segments_under_base() {
        let service = BlogsService::new(config("https://example.com/blogs/")).unwrap();
        let url = service
            .endpoint(&["myblog", "feed", "entries", "atom"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/blogs/myblog/feed/entries/atom"
        );
    }

    #[test]
    fn test_endpoint_skips_empty_auth_segment() {
        let service = BlogsService::new(config("https://example.com/blogs")).unwrap();
        let url = service.endpoint(&["homepage", "entry", "atom"]).unwrap();
        // No double slash where the auth-type segment collapsed.
        assert!(!url.as_str().contains("//homepage"));
    }
}
