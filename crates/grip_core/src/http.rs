//! HTTP access used by the asset manager.
//!
//! The [`Fetch`] trait keeps the asset manager independent from the actual
//! client so that it can be driven by canned responses.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Status and body of a GET request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    /// Issues a GET request, non-2xx statuses are not errors.
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// [`Fetch`] implementation backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(FetchResponse { status, body })
    }
}

/// Resolves `url` against `base` the way browsers resolve relative links.
pub fn urljoin(base: &str, url: &str) -> Result<String, FetchError> {
    let base = reqwest::Url::parse(base).map_err(|e| FetchError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    base.join(url)
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}
