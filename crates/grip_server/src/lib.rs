//! The preview server.
//!
//! [`Grip`] puts a reader, a renderer and the asset manager behind a few
//! routes: the Readme pages, the cached assets, the live refresh stream and
//! the rate limit page.

mod error;
mod routes;

use grip_core::constants::{DEFAULT_GRIPURL, GRIPURL_ENV};
use grip_core::page::{render_index, PageContext};
use grip_core::{
    AssetManager, Auth, Content, ReadmeReader, ReadmeRenderer, RefreshContext, ShutdownSignal,
    Theme, DEFAULT_REFRESH_INTERVAL,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::OnceCell;

pub use error::{GripError, ServerError};

/// Returns the URL prefix of the grip routes, `GRIPURL` when set.
pub fn grip_url_from_env() -> String {
    std::env::var(GRIPURL_ENV)
        .ok()
        .map(|url| normalize_grip_url(&url))
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_GRIPURL.to_string())
}

/// Leading slash, no trailing slash.
fn normalize_grip_url(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone)]
pub struct GripOptions {
    /// Prefix of the grip routes, see [`grip_url_from_env`].
    pub grip_url: String,
    pub autorefresh: bool,
    pub quiet: bool,
    pub render_wide: bool,
    /// Inline the styles and their fonts into the page.
    pub render_inline: bool,
    pub title: Option<String>,
    pub theme: Theme,
    pub auth: Option<Auth>,
    pub refresh_interval: Duration,
}

impl Default for GripOptions {
    fn default() -> Self {
        Self {
            grip_url: grip_url_from_env(),
            autorefresh: true,
            quiet: false,
            render_wide: false,
            render_inline: false,
            title: None,
            theme: Theme::default(),
            auth: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Styles resolved once per server.
#[derive(Debug, Clone, Default)]
struct PageStyles {
    style_urls: Vec<String>,
    styles: Vec<String>,
}

/// What a route produced.
pub(crate) enum Page {
    Html(String),
    Binary {
        mimetype: Option<&'static str>,
        data: Vec<u8>,
    },
    Redirect(String),
}

struct Inner {
    reader: Arc<dyn ReadmeReader>,
    renderer: Arc<dyn ReadmeRenderer>,
    assets: tokio::sync::Mutex<AssetManager>,
    page_styles: OnceCell<PageStyles>,
    options: GripOptions,
    /// Present while the server is running.
    shutdown: Mutex<Option<ShutdownSignal>>,
}

/// A GitHub-flavored Markdown preview server.
#[derive(Clone)]
pub struct Grip {
    inner: Arc<Inner>,
}

impl Grip {
    pub fn new(
        reader: Arc<dyn ReadmeReader>,
        renderer: Arc<dyn ReadmeRenderer>,
        assets: AssetManager,
        options: GripOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                reader,
                renderer,
                assets: tokio::sync::Mutex::new(assets),
                page_styles: OnceCell::new(),
                options,
                shutdown: Mutex::new(None),
            }),
        }
    }

    pub fn options(&self) -> &GripOptions {
        &self.inner.options
    }

    fn grip_url(&self) -> &str {
        &self.inner.options.grip_url
    }

    /// URL prefix of the cached assets.
    pub fn asset_url(&self) -> String {
        format!("{}/asset/", self.grip_url())
    }

    /// Clears the asset cache.
    pub async fn clear_cache(&self) -> std::io::Result<()> {
        self.inner.assets.lock().await.clear()
    }

    /// Whether [`Self::run`] or [`Self::serve`] is in progress.
    pub fn is_running(&self) -> bool {
        self.inner.shutdown.lock().is_some()
    }

    pub(crate) fn shutdown_signal(&self) -> Option<ShutdownSignal> {
        self.inner.shutdown.lock().clone()
    }

    pub(crate) fn refresh_context(&self) -> RefreshContext {
        RefreshContext {
            reader: self.inner.reader.clone(),
            renderer: self.inner.renderer.clone(),
            auth: self.inner.options.auth.clone(),
        }
    }

    /// Retrieves the styles on first use.
    async fn page_styles(&self) -> &PageStyles {
        self.inner
            .page_styles
            .get_or_init(|| async {
                let asset_url = self.asset_url();
                let mut assets = self.inner.assets.lock().await;
                assets.retrieve_styles(&asset_url).await;
                if self.inner.options.render_inline {
                    assets.inline_styles(&asset_url).await;
                }
                PageStyles {
                    style_urls: assets.style_urls.clone(),
                    styles: assets.styles.clone(),
                }
            })
            .await
    }

    /// Produces the page for `subpath`, `None` being the root Readme.
    pub(crate) async fn page(&self, subpath: Option<&str>) -> Result<Page, GripError> {
        let page_styles = self.page_styles().await;
        let reader = &self.inner.reader;

        // Redirect to the normalized subpath, keeping relative links working.
        let normalized = reader.normalize_subpath(subpath);
        if normalized.as_deref() != subpath {
            let target = format!("/{}", normalized.unwrap_or_default());
            tracing::debug!(?subpath, %target, "Redirecting to normalized subpath");
            return Ok(Page::Redirect(target));
        }

        if reader.is_binary(subpath) {
            let Content::Binary(data) = reader.read(subpath)? else {
                return Err(GripError::Internal("expected binary content".into()));
            };
            return Ok(Page::Binary {
                mimetype: reader.mimetype_for(subpath),
                data,
            });
        }

        let content = reader.read(subpath)?;
        let text = content
            .as_text()
            .ok_or_else(|| GripError::Internal("expected text content".into()))?;

        let options = &self.inner.options;
        let html = self
            .inner
            .renderer
            .render(text, options.auth.as_ref())
            .await
            .map_err(|err| GripError::from_render(err, options.auth.is_some()))?;

        let filename = reader.filename_for(subpath);
        let autorefresh_url = options
            .autorefresh
            .then(|| format!("{}/refresh/{}", self.grip_url(), subpath.unwrap_or_default()));

        Ok(Page::Html(render_index(&PageContext {
            filename: filename.as_deref(),
            title: options.title.as_deref(),
            content: &html,
            user_content: self.inner.renderer.user_content(),
            wide: options.render_wide,
            style_urls: &page_styles.style_urls,
            styles: &page_styles.styles,
            autorefresh_url: autorefresh_url.as_deref(),
            theme: options.theme,
        })))
    }

    /// Renders `route` to a string without starting a server.
    ///
    /// `None` or `/` renders the root Readme.
    pub async fn render(&self, route: Option<&str>) -> Result<String, ServerError> {
        let mut subpath = route
            .map(|route| route.trim_start_matches('/').to_string())
            .filter(|route| !route.is_empty());

        // Follows at most one redirect, normalized subpaths are stable.
        for _ in 0..2 {
            match self.page(subpath.as_deref()).await? {
                Page::Html(html) => return Ok(html),
                Page::Binary { .. } => {
                    return Err(ServerError::Binary {
                        route: route.unwrap_or("/").to_string(),
                    })
                }
                Page::Redirect(target) => {
                    subpath = Some(target.trim_start_matches('/').to_string())
                        .filter(|target| !target.is_empty());
                }
            }
        }

        Err(GripError::Internal(format!("redirect loop at {route:?}")).into())
    }

    /// Serves on `listener` until `shutdown` resolves.
    ///
    /// Every open refresh stream is ended before the server stops accepting
    /// connections.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let signal = {
            let mut running = self.inner.shutdown.lock();
            if running.is_some() {
                return Err(ServerError::AlreadyRunning);
            }
            let signal = ShutdownSignal::new();
            *running = Some(signal.clone());
            signal
        };

        let router = routes::router(self.clone());
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                signal.set();
            })
            .await;

        self.inner.shutdown.lock().take();

        result.map_err(Into::into)
    }

    /// Starts a server on `host:port` and serves until Ctrl-C.
    pub async fn run(&self, host: &str, port: u16, open_browser: bool) -> Result<(), ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }

        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let browser_host = if host == "0.0.0.0" { "localhost" } else { host };
        let url = format!("http://{browser_host}:{}/", local_addr.port());

        if !self.inner.options.quiet {
            tracing::info!("Running on {url} (Press CTRL+C to quit)");
        }

        if open_browser {
            let url = url.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(err) = webbrowser::open(&url) {
                    tracing::error!(?err, "Failed to open the browser");
                }
            });
        }

        self.serve(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(?err, "Failed to listen for Ctrl-C");
            }
        })
        .await?;

        if !self.inner.options.quiet {
            tracing::info!("Server stopped");
        }

        Ok(())
    }
}
