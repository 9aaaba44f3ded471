use crate::{Grip, GripError, Page};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use grip_core::document::mimetype_for;
use grip_core::page::render_rate_limit;
use grip_core::refresh_stream;
use serde::Deserialize;
use std::convert::Infallible;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

pub(crate) fn router(grip: Grip) -> Router {
    let grip_url = grip.grip_url().to_string();

    Router::new()
        .route("/", get(render_root))
        .route("/*subpath", get(render_subpath))
        .route(&format!("{grip_url}/asset/*subpath"), get(render_asset))
        .route(&format!("{grip_url}/refresh/"), get(refresh_root))
        .route(&format!("{grip_url}/refresh/*subpath"), get(refresh_subpath))
        .route(&format!("{grip_url}/rate-limit-preview"), get(rate_limit_preview))
        .with_state(grip)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

async fn render_root(State(grip): State<Grip>) -> Result<Response, GripError> {
    render_page(grip, None).await
}

async fn render_subpath(
    State(grip): State<Grip>,
    Path(subpath): Path<String>,
) -> Result<Response, GripError> {
    render_page(grip, Some(subpath)).await
}

async fn render_page(grip: Grip, subpath: Option<String>) -> Result<Response, GripError> {
    let response = match grip.page(subpath.as_deref()).await? {
        Page::Html(html) => Html(html).into_response(),
        Page::Binary { mimetype, data } => (
            [(CONTENT_TYPE, mimetype.unwrap_or("application/octet-stream"))],
            data,
        )
            .into_response(),
        Page::Redirect(target) => (StatusCode::FOUND, [(LOCATION, target)]).into_response(),
    };
    Ok(response)
}

async fn render_asset(
    State(grip): State<Grip>,
    Path(subpath): Path<String>,
) -> Result<Response, GripError> {
    let cached_file = grip
        .inner
        .assets
        .lock()
        .await
        .cached_file(&subpath)
        .ok_or_else(|| GripError::NotFound(subpath.clone()))?;

    let data = match tokio::fs::read(&cached_file).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound || cached_file.is_dir() => {
            return Err(GripError::NotFound(subpath));
        }
        Err(err) => return Err(GripError::Internal(err.to_string())),
    };

    let mimetype = mimetype_for(&cached_file).unwrap_or("application/octet-stream");
    Ok(([(CONTENT_TYPE, mimetype)], data).into_response())
}

async fn refresh_root(State(grip): State<Grip>) -> Response {
    refresh(grip, None)
}

async fn refresh_subpath(State(grip): State<Grip>, Path(subpath): Path<String>) -> Response {
    refresh(grip, Some(subpath))
}

fn refresh(grip: Grip, subpath: Option<String>) -> Response {
    if !grip.options().autorefresh {
        return GripError::NotFound("autorefresh is disabled".into()).into_response();
    }

    let headers = [(CONTENT_TYPE, "text/event-stream"), (CACHE_CONTROL, "no-cache")];

    // Nothing to stream once the server is stopping.
    let signal = match grip.shutdown_signal() {
        Some(signal) if !signal.is_set() => signal,
        _ => return (headers, Body::empty()).into_response(),
    };

    tracing::debug!(?subpath, "Starting refresh stream");

    let frames = refresh_stream(
        grip.refresh_context(),
        subpath,
        signal,
        grip.options().refresh_interval,
    )
    .map(|event| Ok::<_, Infallible>(event.to_frame()));

    (headers, Body::from_stream(frames)).into_response()
}

#[derive(Debug, Deserialize)]
struct RateLimitQuery {
    auth: Option<String>,
}

async fn rate_limit_preview(Query(query): Query<RateLimitQuery>) -> Response {
    let is_authenticated = query.auth.is_some_and(|auth| !auth.is_empty());
    (StatusCode::FORBIDDEN, Html(render_rate_limit(is_authenticated))).into_response()
}
