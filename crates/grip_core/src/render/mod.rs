//! Markdown to HTML rendering.
//!
//! - [`GitHubRenderer`] asks the GitHub Markdown API, which gives the exact
//!   output GitHub shows.
//! - [`OfflineRenderer`] renders locally with pulldown-cmark.

mod github;
mod offline;
pub mod patch;

use async_trait::async_trait;

pub use github::GitHubRenderer;
pub use offline::{slugify, OfflineRenderer};

/// Basic auth credentials, the password may be a personal access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

impl Auth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The rendering API answered with a non-200 status.
    #[error("{status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Reqwest error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Other(String),
}

impl RenderError {
    /// Returns the upstream status code, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            Self::Other(_) => None,
        }
    }

    /// GitHub answers 403 once the anonymous quota is exhausted.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(403)
    }
}

/// Renders the Readme.
#[async_trait]
pub trait ReadmeRenderer: Send + Sync {
    /// Whether the text is rendered like a comment or issue rather than a
    /// document.
    fn user_content(&self) -> bool;

    /// Renders the markdown `text` to an HTML fragment.
    async fn render(&self, text: &str, auth: Option<&Auth>) -> Result<String, RenderError>;
}
