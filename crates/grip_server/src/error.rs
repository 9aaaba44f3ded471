use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use grip_core::page::render_rate_limit;
use grip_core::{ReadError, RenderError};

/// Errors raised while serving a page.
#[derive(Debug, thiserror::Error)]
pub enum GripError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("GitHub API rate limit exceeded")]
    RateLimited { is_authenticated: bool },
    /// Relayed from the rendering API.
    #[error("{status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    Internal(String),
}

impl GripError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::FORBIDDEN,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn from_render(err: RenderError, is_authenticated: bool) -> Self {
        if err.is_rate_limited() {
            return Self::RateLimited { is_authenticated };
        }
        match err {
            RenderError::Upstream { status, message } => Self::Upstream { status, message },
            err => Self::Internal(err.to_string()),
        }
    }
}

impl From<ReadError> for GripError {
    fn from(err: ReadError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for GripError {
    fn into_response(self) -> Response {
        match self {
            Self::RateLimited { is_authenticated } => (
                StatusCode::FORBIDDEN,
                Html(render_rate_limit(is_authenticated)),
            )
                .into_response(),
            err => {
                tracing::debug!(%err, "Responding with error");
                (err.status(), err.to_string()).into_response()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server already running")]
    AlreadyRunning,
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Page(#[from] GripError),
    #[error("{route} is a binary file")]
    Binary { route: String },
}

impl ServerError {
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, Self::Bind { source, .. } if source.kind() == std::io::ErrorKind::AddrInUse)
    }
}
