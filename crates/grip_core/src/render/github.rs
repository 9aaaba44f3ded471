use super::{patch::patch, Auth, ReadmeRenderer, RenderError};
use crate::constants::DEFAULT_API_URL;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

#[derive(Serialize)]
struct MarkdownRequest<'a> {
    text: &'a str,
    mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

/// Renders the Readme using the GitHub Markdown API.
#[derive(Debug, Clone)]
pub struct GitHubRenderer {
    user_content: bool,
    context: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl Default for GitHubRenderer {
    fn default() -> Self {
        Self::new(false, None, None)
    }
}

impl GitHubRenderer {
    pub fn new(user_content: bool, context: Option<String>, api_url: Option<String>) -> Self {
        let api_url = api_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            user_content,
            context,
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

/// Extracts the `message` of a GitHub error body, the raw body otherwise.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(ToString::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ReadmeRenderer for GitHubRenderer {
    fn user_content(&self) -> bool {
        self.user_content
    }

    async fn render(&self, text: &str, auth: Option<&Auth>) -> Result<String, RenderError> {
        let request = if self.user_content {
            let data = MarkdownRequest {
                text,
                mode: "gfm",
                context: self.context.as_deref(),
            };
            let body = serde_json::to_vec(&data).map_err(|e| RenderError::Other(e.to_string()))?;
            self.client
                .post(format!("{}/markdown", self.api_url))
                .header(CONTENT_TYPE, "application/json; charset=UTF-8")
                .body(body)
        } else {
            self.client
                .post(format!("{}/markdown/raw", self.api_url))
                .header(CONTENT_TYPE, "text/x-markdown; charset=UTF-8")
                .body(text.to_string())
        };

        let request = match auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        };

        tracing::debug!(api_url = %self.api_url, user_content = self.user_content, "Rendering via GitHub");

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        // Relay HTTP errors
        if status != 200 {
            return Err(RenderError::Upstream {
                status,
                message: error_message(&body),
            });
        }

        Ok(patch(&body, self.user_content))
    }
}
