//! Core library for grip.
//!
//! This crate provides the reusable pieces behind the preview server: locating
//! and reading READMEs, rendering markdown either through the GitHub API or
//! locally, retrieving and caching the GitHub stylesheets, and the polling loop
//! which drives the live refresh.
//!
//! # Modules
//!
//! - [`reader`] - Readme sources (directory, literal text, stdin)
//! - [`render`] - Markdown to HTML, remotely or offline
//! - [`assets`] - Style discovery, caching and inlining
//! - [`refresh`] - Live-refresh polling loop
//! - [`page`] - HTML page templates
//! - [`http`] - The HTTP seam used by the asset manager

pub mod assets;
pub mod constants;
pub mod document;
pub mod http;
pub mod page;
pub mod reader;
pub mod refresh;
pub mod render;

// Re-export commonly used types at crate root
pub use assets::{AssetError, AssetManager};
pub use http::{Fetch, FetchError, HttpFetcher};
pub use page::{PageContext, Theme};
pub use reader::{Content, DirectoryReader, ReadError, ReadmeReader, StdinReader, TextReader};
pub use refresh::{
    refresh_stream, RefreshContext, RefreshEvent, ShutdownSignal, DEFAULT_REFRESH_INTERVAL,
};
pub use render::{Auth, GitHubRenderer, OfflineRenderer, ReadmeRenderer, RenderError};

/// Version of the running grip, used to name the cache directory.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
