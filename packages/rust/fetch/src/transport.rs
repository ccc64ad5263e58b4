//! Transport layer for everything that touches the network.
//!
//! All outbound requests go through the [`UrlFetcher`] trait so the rest of
//! the pipeline never holds a concrete HTTP client. Production runs use
//! [`HttpFetcher`] (reqwest); tests and offline runs use [`FixtureFetcher`],
//! which serves canned responses from memory or from a fixture directory.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use lexhound_shared::error::{LexhoundError, Result};
use lexhound_shared::types::Reason;
use serde::Deserialize;

const USER_AGENT: &str = concat!("lexhound/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

// ----------------------------------------------------------------------------
// Response shape
// ----------------------------------------------------------------------------

/// What a transport hands back for one request.
///
/// Transport failures (DNS, TLS, timeout) surface as `Err(Reason)`; an HTTP
/// error status is still an `Ok` response so callers can apply their own
/// status policy.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// URL after redirects were followed.
    pub final_url: String,
    pub content_type: Option<String>,
    /// Header value for HEAD requests, body length for GET.
    pub content_length: Option<u64>,
    /// Empty for HEAD requests.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Media type with parameters stripped, lowercased: `text/html; charset=x`
    /// becomes `text/html`.
    pub fn content_type_base(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|value| value.split(';').next())
            .map(|base| base.trim().to_ascii_lowercase())
            .filter(|base| !base.is_empty())
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

// ----------------------------------------------------------------------------
// Trait
// ----------------------------------------------------------------------------

/// Minimal fetch surface used by validation, capture, and crawl.
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    /// Headers-only probe. Implementations follow redirects themselves.
    async fn head(&self, url: &str, timeout: Duration) -> std::result::Result<FetchResponse, Reason>;

    /// Full body fetch.
    async fn get(&self, url: &str, timeout: Duration) -> std::result::Result<FetchResponse, Reason>;
}

// ----------------------------------------------------------------------------
// reqwest-backed fetcher
// ----------------------------------------------------------------------------

/// Production transport wrapping a shared [`reqwest::Client`].
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| LexhoundError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn map_error(error: reqwest::Error) -> Reason {
        if error.is_timeout() {
            Reason::Timeout
        } else {
            Reason::FetchFailed
        }
    }
}

#[async_trait]
impl UrlFetcher for HttpFetcher {
    async fn head(&self, url: &str, timeout: Duration) -> std::result::Result<FetchResponse, Reason> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        Ok(FetchResponse {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
            content_type: header_string(&response, reqwest::header::CONTENT_TYPE),
            content_length: response.content_length(),
            body: Vec::new(),
        })
    }

    async fn get(&self, url: &str, timeout: Duration) -> std::result::Result<FetchResponse, Reason> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = header_string(&response, reqwest::header::CONTENT_TYPE);
        let body = response.bytes().await.map_err(Self::map_error)?.to_vec();
        Ok(FetchResponse {
            status,
            final_url,
            content_type,
            content_length: Some(body.len() as u64),
            body,
        })
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

// ----------------------------------------------------------------------------
// Fixture fetcher
// ----------------------------------------------------------------------------

/// One canned response in a [`FixtureFetcher`].
#[derive(Debug, Clone)]
pub struct FixtureResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// When set, the fetcher follows this instead of answering directly.
    pub redirect_to: Option<String>,
}

impl FixtureResponse {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.as_bytes().to_vec(),
            redirect_to: None,
        }
    }

    pub fn pdf(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some("application/pdf".to_string()),
            body,
            redirect_to: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: Some("text/html".to_string()),
            body: Vec::new(),
            redirect_to: None,
        }
    }

    pub fn redirect(target: &str) -> Self {
        Self {
            status: 301,
            content_type: None,
            body: Vec::new(),
            redirect_to: Some(target.to_string()),
        }
    }
}

/// In-memory transport keyed by exact URL. Unknown URLs answer `FETCH_FAILED`,
/// which mirrors how a dead host looks to the HTTP fetcher.
#[derive(Default)]
pub struct FixtureFetcher {
    routes: HashMap<String, FixtureResponse>,
}

#[derive(Debug, Deserialize)]
struct FixtureIndexEntry {
    file: String,
    #[serde(default = "default_fixture_status")]
    status: u16,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    redirect_to: Option<String>,
}

fn default_fixture_status() -> u16 {
    200
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: FixtureResponse) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    /// Loads routes from `<dir>/index.json`, a map of URL to
    /// `{file, status?, content_type?, redirect_to?}` with file paths
    /// resolved relative to the directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let index_path = dir.join("index.json");
        let raw = std::fs::read_to_string(&index_path)
            .map_err(|e| LexhoundError::io(&index_path, e))?;
        let index: HashMap<String, FixtureIndexEntry> = serde_json::from_str(&raw)
            .map_err(|e| LexhoundError::parse(format!("fixture index {}: {e}", index_path.display())))?;
        let mut routes = HashMap::new();
        for (url, entry) in index {
            let file_path = dir.join(&entry.file);
            let body = std::fs::read(&file_path).map_err(|e| LexhoundError::io(&file_path, e))?;
            let content_type = entry
                .content_type
                .or_else(|| guess_content_type(&entry.file).map(str::to_string));
            routes.insert(
                url,
                FixtureResponse {
                    status: entry.status,
                    content_type,
                    body,
                    redirect_to: entry.redirect_to,
                },
            );
        }
        Ok(Self { routes })
    }

    fn resolve(&self, url: &str) -> std::result::Result<(FixtureResponse, String), Reason> {
        let mut current = url.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let response = self.routes.get(&current).ok_or(Reason::FetchFailed)?;
            match &response.redirect_to {
                Some(target) => current = target.clone(),
                None => return Ok((response.clone(), current)),
            }
        }
        Err(Reason::FetchFailed)
    }
}

fn guess_content_type(file: &str) -> Option<&'static str> {
    let lower = file.to_ascii_lowercase();
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        Some("text/html")
    } else if lower.ends_with(".pdf") {
        Some("application/pdf")
    } else if lower.ends_with(".json") {
        Some("application/json")
    } else if lower.ends_with(".txt") {
        Some("text/plain")
    } else {
        None
    }
}

#[async_trait]
impl UrlFetcher for FixtureFetcher {
    async fn head(&self, url: &str, _timeout: Duration) -> std::result::Result<FetchResponse, Reason> {
        let (response, final_url) = self.resolve(url)?;
        Ok(FetchResponse {
            status: response.status,
            final_url,
            content_type: response.content_type.clone(),
            content_length: Some(response.body.len() as u64),
            body: Vec::new(),
        })
    }

    async fn get(&self, url: &str, _timeout: Duration) -> std::result::Result<FetchResponse, Reason> {
        let (response, final_url) = self.resolve(url)?;
        let length = response.body.len() as u64;
        Ok(FetchResponse {
            status: response.status,
            final_url,
            content_type: response.content_type.clone(),
            content_length: Some(length),
            body: response.body,
        })
    }
}
