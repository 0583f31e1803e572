// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Navigator
 * Network fetch collaborator: URL resolution, retrieval, connection records
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::errors::{FetchError, SetupError};
use crate::logging::EventSink;
use crate::personality::Personality;
use crate::types::FetchedLocation;

/// Maximum response body size (10MB) to prevent memory exhaustion on
/// attacker-controlled payloads.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Options for one fetch: extra headers plus the navigation kind recorded in
/// the connection log (`iframe`, `meta`, `WinExec`, ...).
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
    pub kind: String,
}

impl FetchOptions {
    pub fn kind(kind: &str) -> Self {
        Self {
            headers: Vec::new(),
            kind: kind.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A fetched response. `status` is surfaced rather than mapped to an error
/// so handlers can apply their own not-found policies.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub status: u16,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResource {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Body as text: strict UTF-8 first, lossy recovery second.
    pub fn text(&self) -> String {
        match std::str::from_utf8(&self.body) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }
}

/// Network collaborator. Every transport or URL problem surfaces as a
/// [`FetchError`], which the engine always treats as non-fatal.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Fetch `url`, resolved against `base` when relative.
    async fn fetch(
        &self,
        base: &str,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchedResource, FetchError>;

    /// Resolve and normalize a possibly-relative URL against a base.
    fn normalize_url(&self, base: &str, url: &str) -> Option<String>;
}

/// Default navigator backed by reqwest. Sends the personality's User-Agent,
/// resolves relative URLs, decodes `data:` URIs locally, and records every
/// access as a connection plus a fetched-location digest in the sink.
pub struct HttpNavigator {
    client: Arc<Client>,
    personality: Arc<Personality>,
    sink: Arc<dyn EventSink>,
    max_body_size: usize,
}

impl HttpNavigator {
    pub fn new(
        personality: Arc<Personality>,
        sink: Arc<dyn EventSink>,
        timeout_secs: u64,
    ) -> Result<Self, SetupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(personality.user_agent.clone())
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| SetupError::HttpClient(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            personality,
            sink,
            max_body_size: MAX_BODY_SIZE,
        })
    }

    fn resolve(&self, base: &str, url: &str) -> Result<Url, FetchError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        let base = Url::parse(base).map_err(|e| FetchError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        base.join(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn decode_data_uri(url: &Url) -> Result<FetchedResource, FetchError> {
        let payload = url.path();
        let (meta, data) = payload.split_once(',').ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "data URI without payload".to_string(),
        })?;

        let body = if meta.ends_with(";base64") {
            BASE64
                .decode(data.trim())
                .map_err(|e| FetchError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
        } else {
            percent_decode(data)
        };

        let content_type = meta
            .trim_end_matches(";base64")
            .split(';')
            .next()
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(FetchedResource {
            status: 200,
            final_url: url.to_string(),
            content_type,
            body,
        })
    }

    fn build_headers(&self, options: &FetchOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            let Ok(value) = HeaderValue::from_str(value) else {
                continue;
            };
            headers.insert(name, value);
        }
        headers
    }

    fn record(&self, base: &str, resource: &FetchedResource, kind: &str) {
        self.sink.log_connection(base, &resource.final_url, kind, None);
        self.sink.log_location(FetchedLocation {
            url: resource.final_url.clone(),
            content_type: resource.content_type.clone(),
            sha256: format!("{:x}", Sha256::digest(&resource.body)),
            size: resource.body.len(),
        });
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn fetch(
        &self,
        base: &str,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchedResource, FetchError> {
        let resolved = self.resolve(base, url)?;
        debug!(url = %resolved, kind = options.kind, "fetching");

        let resource = match resolved.scheme() {
            "data" => Self::decode_data_uri(&resolved)?,
            "http" | "https" => {
                let response = self
                    .client
                    .get(resolved.clone())
                    .headers(self.build_headers(&options))
                    .send()
                    .await
                    .map_err(|e| FetchError::Transport {
                        url: resolved.to_string(),
                        reason: e.to_string(),
                    })?;

                let status = response.status().as_u16();
                let final_url = response.url().to_string();
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                let body = response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::Transport {
                        url: final_url.clone(),
                        reason: e.to_string(),
                    })?;
                if body.len() > self.max_body_size {
                    return Err(FetchError::BodyTooLarge {
                        url: final_url,
                        limit: self.max_body_size,
                    });
                }

                FetchedResource {
                    status,
                    final_url,
                    content_type,
                    body: body.to_vec(),
                }
            }
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        };

        self.record(base, &resource, &options.kind);
        Ok(resource)
    }

    fn normalize_url(&self, base: &str, url: &str) -> Option<String> {
        self.resolve(base, url).ok().map(|u| u.to_string())
    }
}

fn percent_decode(data: &str) -> Vec<u8> {
    let bytes = data.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(value) = u8::from_str_radix(&data[i + 1..i + 3], 16) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn navigator() -> HttpNavigator {
        HttpNavigator::new(
            Arc::new(Personality::default()),
            Arc::new(MemorySink::new()),
            5,
        )
        .unwrap()
    }

    #[test]
    fn normalize_resolves_relative_urls() {
        let nav = navigator();
        assert_eq!(
            nav.normalize_url("http://example.test/dir/page.html", "../x"),
            Some("http://example.test/x".to_string())
        );
        assert_eq!(
            nav.normalize_url("http://example.test/", "http://other.test/a"),
            Some("http://other.test/a".to_string())
        );
        assert!(nav.normalize_url("not a url", "also relative").is_none());
    }

    #[tokio::test]
    async fn data_uri_decodes_base64() {
        let nav = navigator();
        let resource = nav
            .fetch(
                "http://example.test/",
                "data:text/plain;base64,aGVsbG8=",
                FetchOptions::kind("embed"),
            )
            .await
            .unwrap();
        assert_eq!(resource.status, 200);
        assert_eq!(resource.body, b"hello");
        assert_eq!(resource.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn data_uri_decodes_percent_escapes() {
        let nav = navigator();
        let resource = nav
            .fetch(
                "http://example.test/",
                "data:,a%20b",
                FetchOptions::kind("embed"),
            )
            .await
            .unwrap();
        assert_eq!(resource.body, b"a b");
    }

    #[test]
    fn lossy_text_recovers_bad_utf8() {
        let resource = FetchedResource {
            status: 200,
            final_url: "http://example.test/".to_string(),
            content_type: None,
            body: vec![b'a', 0xff, b'b'],
        };
        assert_eq!(resource.text(), "a\u{fffd}b");
    }
}
