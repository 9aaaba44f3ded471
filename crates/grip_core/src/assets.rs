//! Styles and fonts rendered along with the README.
//!
//! The styles GitHub uses are discovered by scraping a reference page. With a
//! cache directory configured they are downloaded once, together with the
//! fonts they reference, and served locally from then on.

use crate::constants::{
    style_asset_urls_inline_re, STYLE_ASSET_URLS_RE, STYLE_URLS_RES, STYLE_URLS_SOURCE,
};
use crate::http::{urljoin, Fetch, FetchError};
use base64::Engine;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{url} responded with {status}")]
    Status { url: String, status: u16 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No cache directory configured")]
    NoCache,
}

/// Manages the style and font assets rendered with Readme pages.
///
/// Set `cache_path` to `None` to disable caching.
pub struct AssetManager {
    cache_path: Option<PathBuf>,
    /// Stylesheets linked from the page.
    pub style_urls: Vec<String>,
    /// Stylesheets inlined into the page.
    pub styles: Vec<String>,
    fetcher: Arc<dyn Fetch>,
    source_url: String,
}

impl std::fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("cache_path", &self.cache_path)
            .field("style_urls", &self.style_urls)
            .field("styles", &self.styles.len())
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// Strips the trailing slashes, an empty url becomes `/`.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else {
        trimmed.into()
    }
}

fn join_url(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Extracts the stylesheet URLs linked from `html`.
pub fn extract_style_urls(html: &str) -> Vec<String> {
    STYLE_URLS_RES
        .iter()
        .flat_map(|re| re.captures_iter(html))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

impl AssetManager {
    pub fn new(
        cache_path: Option<PathBuf>,
        style_urls: Vec<String>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        Self {
            cache_path,
            style_urls,
            styles: Vec::new(),
            fetcher,
            source_url: STYLE_URLS_SOURCE.to_string(),
        }
    }

    /// Overrides the page scanned for stylesheets.
    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = source_url.into();
        self
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Clears the asset cache.
    pub fn clear(&self) -> std::io::Result<()> {
        if let Some(cache_path) = &self.cache_path {
            if cache_path.exists() {
                std::fs::remove_dir_all(cache_path)?;
            }
        }
        Ok(())
    }

    /// Derives the cache filename of `url`: query and fragment stripped, last
    /// path segment kept.
    ///
    /// URLs sharing their last segment share the cache entry.
    ///
    /// ```
    /// use grip_core::AssetManager;
    ///
    /// assert_eq!(AssetManager::cache_filename("http://x/a/style.css?v=2#top"), "style.css");
    /// ```
    pub fn cache_filename(url: &str) -> String {
        let url = url.split_once('?').map_or(url, |(before, _)| before);
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        url.rsplit('/').next().unwrap_or(url).to_string()
    }

    /// Location of the cached copy of `url`, `None` without a cache or when
    /// `url` names no file.
    pub fn cached_file(&self, url: &str) -> Option<PathBuf> {
        let filename = Self::cache_filename(url);
        if matches!(filename.as_str(), "" | "." | "..") {
            return None;
        }
        self.cache_path
            .as_ref()
            .map(|cache_path| cache_path.join(filename))
    }

    /// Populates [`Self::style_urls`] from the cache or the reference page and
    /// returns the URLs added.
    ///
    /// Failures are logged and leave the list untouched, styling is cosmetic.
    pub async fn retrieve_styles(&mut self, asset_url: &str) -> Vec<String> {
        let asset_url = normalize_base_url(asset_url);

        match self.get_style_urls(&asset_url).await {
            Ok(urls) => {
                if urls.is_empty() {
                    tracing::debug!(source = %self.source_url, "No style URLs found");
                }
                self.style_urls.extend(urls.iter().cloned());
                urls
            }
            Err(err) => {
                tracing::warn!(%err, "Could not retrieve styles");
                Vec::new()
            }
        }
    }

    async fn get_style_urls(&self, asset_url: &str) -> Result<Vec<String>, AssetError> {
        // Skip fetching styles if there's any already cached.
        if self.cache_path.is_some() {
            let cached = self.cached_style_urls(asset_url);
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let response = self.fetcher.get(&self.source_url).await?;
        if !response.is_success() {
            tracing::warn!(
                status = response.status,
                source = %self.source_url,
                "Retrieving styles gave a non-success status code"
            );
        }
        let urls = extract_style_urls(&response.text());

        if self.cache_path.is_some() && self.cache_contents(&urls, asset_url).await? {
            return Ok(self.cached_style_urls(asset_url));
        }

        Ok(urls)
    }

    /// URLs of the cached `.css` files under `asset_url`, sorted by name.
    fn cached_style_urls(&self, asset_url: &str) -> Vec<String> {
        let Some(cache_path) = &self.cache_path else {
            return Vec::new();
        };

        let Ok(entries) = std::fs::read_dir(cache_path) else {
            return Vec::new();
        };

        let mut styles = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".css"))
            .collect::<Vec<_>>();
        styles.sort();

        styles
            .into_iter()
            .map(|style| join_url(asset_url, &style))
            .collect()
    }

    /// Downloads the styles and their font assets and writes them to the cache.
    ///
    /// Nothing is written unless every download succeeds, so that the next call
    /// retries the whole batch. Returns whether the cache was filled.
    async fn cache_contents(&self, style_urls: &[String], asset_url: &str) -> Result<bool, AssetError> {
        let cache_path = self.cache_path.as_ref().ok_or(AssetError::NoCache)?;

        let mut files = BTreeMap::new();
        let mut failed = false;
        let mut asset_urls = Vec::new();

        for style_url in style_urls {
            tracing::info!(%style_url, "Downloading style");
            let response = self.fetcher.get(style_url).await?;
            if !response.is_success() {
                tracing::warn!(status = response.status, %style_url, "Style request failed");
                failed = true;
                continue;
            }

            let content = response.text();

            // Find assets and replace their base URLs with the cache directory.
            for caps in STYLE_ASSET_URLS_RE.captures_iter(&content) {
                asset_urls.push(urljoin(style_url, &caps[1])?);
            }
            let rewritten = STYLE_ASSET_URLS_RE.replace_all(&content, |caps: &regex::Captures| {
                format!("url(\"{asset_url}{}\")", &caps[1])
            });

            files.insert(Self::cache_filename(style_url), rewritten.into_owned().into_bytes());
        }

        for url in asset_urls {
            tracing::info!(asset_url = %url, "Downloading asset");
            let response = self.fetcher.get(&url).await?;
            if !response.is_success() {
                tracing::warn!(status = response.status, asset_url = %url, "Asset request failed");
                failed = true;
                continue;
            }
            files.insert(Self::cache_filename(&url), response.body);
        }

        if failed || files.is_empty() {
            return Ok(false);
        }

        std::fs::create_dir_all(cache_path)?;

        let mut written = Vec::with_capacity(files.len());
        for (filename, data) in files {
            let path = cache_path.join(filename);
            if let Err(err) = std::fs::write(&path, data) {
                for path in written {
                    let _ = std::fs::remove_file(path);
                }
                return Err(err.into());
            }
            written.push(path);
        }

        tracing::info!(cache_path = %cache_path.display(), "Cached all downloads");

        Ok(true)
    }

    /// Downloads every linked stylesheet, inlines the fonts it references as
    /// data URLs and moves the result from [`Self::style_urls`] to [`Self::styles`].
    pub async fn inline_styles(&mut self, asset_url: &str) {
        let asset_url = normalize_base_url(asset_url);
        let inline_re = style_asset_urls_inline_re(&asset_url);

        for style_url in std::mem::take(&mut self.style_urls) {
            let content = match self.download(&style_url, &asset_url).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(err) => {
                    tracing::warn!(%err, %style_url, "Could not inline style");
                    continue;
                }
            };

            let mut inlined = String::with_capacity(content.len());
            let mut last = 0;
            for caps in inline_re.captures_iter(&content) {
                let (Some(whole), Some(url)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                inlined.push_str(&content[last..whole.start()]);
                match self.to_data_url(url.as_str(), &style_url, &asset_url).await {
                    Ok(data_url) => inlined.push_str(&format!("url({data_url})")),
                    Err(err) => {
                        tracing::warn!(%err, url = url.as_str(), "Could not inline asset");
                        inlined.push_str(whole.as_str());
                    }
                }
                last = whole.end();
            }
            inlined.push_str(&content[last..]);

            self.styles.push(inlined);
        }
    }

    /// Reads `url` from the cache when it points at the asset route, fetches it
    /// otherwise.
    async fn download(&self, url: &str, asset_url: &str) -> Result<Vec<u8>, AssetError> {
        let local_prefix = join_url(asset_url, "");
        if url.starts_with(&local_prefix) {
            let path = self.cached_file(url).ok_or(AssetError::NoCache)?;
            return Ok(tokio::fs::read(path).await?);
        }

        let response = self.fetcher.get(url).await?;
        if !response.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }

    async fn to_data_url(
        &self,
        url: &str,
        style_url: &str,
        asset_url: &str,
    ) -> Result<String, AssetError> {
        let local_prefix = join_url(asset_url, "");
        let resolved = if url.starts_with(&local_prefix) {
            url.to_string()
        } else {
            // Relative references resolve against the stylesheet when it is
            // remote, against the reference page otherwise.
            let base = if style_url.starts_with(&local_prefix) {
                self.source_url.as_str()
            } else {
                style_url
            };
            urljoin(base, url)?
        };

        let asset = self.download(&resolved, asset_url).await?;
        let filename = Self::cache_filename(url);
        let ext = filename.rsplit_once('.').map_or("", |(_, ext)| ext);
        let encoded = base64::engine::general_purpose::STANDARD.encode(asset);

        Ok(format!("data:font/{ext};base64,{encoded}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::FakeFetcher;

    const ASSET_URL: &str = "/__/grip/asset/";

    fn reference_page() -> String {
        r#"<html><head>
<link crossorigin="anonymous" media="all" href="https://assets.example.com/light.css" rel="stylesheet" />
<link rel="stylesheet" href="https://assets.example.com/github.css?v=3" media="all" />
</head></html>"#
            .to_string()
    }

    fn fetcher_with_styles() -> FakeFetcher {
        FakeFetcher::default()
            .with(STYLE_URLS_SOURCE, 200, reference_page())
            .with(
                "https://assets.example.com/light.css",
                200,
                "body{color:#000}",
            )
            .with(
                "https://assets.example.com/github.css?v=3",
                200,
                "@font-face{src:url('/static/fonts/octicons/octicons.woff?v=1')}",
            )
            .with(
                "https://assets.example.com/static/fonts/octicons/octicons.woff?v=1",
                200,
                vec![0u8, 1, 2, 3],
            )
    }

    #[test]
    fn test_cache_filename() {
        assert_eq!(AssetManager::cache_filename("http://x/a/style.css?v=2#top"), "style.css");
        assert_eq!(AssetManager::cache_filename("http://x/a/font.woff#iefix"), "font.woff");
        assert_eq!(AssetManager::cache_filename("static/fonts/octicons/a.woff"), "a.woff");
        assert_eq!(AssetManager::cache_filename("plain.css"), "plain.css");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("/__/grip/asset/"), "/__/grip/asset");
        assert_eq!(normalize_base_url(""), "/");
        assert_eq!(normalize_base_url("///"), "/");
        assert_eq!(join_url("/", "a.css"), "/a.css");
    }

    #[tokio::test]
    async fn test_retrieve_without_cache() {
        let fetcher = Arc::new(fetcher_with_styles());
        let mut assets = AssetManager::new(None, Vec::new(), fetcher.clone());

        let urls = assets.retrieve_styles(ASSET_URL).await;

        assert_eq!(
            urls,
            vec![
                "https://assets.example.com/light.css".to_string(),
                "https://assets.example.com/github.css?v=3".to_string(),
            ]
        );
        assert_eq!(assets.style_urls, urls);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_fill_cache_and_short_circuit() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("cache");
        let fetcher = Arc::new(fetcher_with_styles());

        let mut assets = AssetManager::new(Some(cache_path.clone()), Vec::new(), fetcher.clone());
        let urls = assets.retrieve_styles(ASSET_URL).await;

        assert_eq!(
            urls,
            vec![
                "/__/grip/asset/github.css".to_string(),
                "/__/grip/asset/light.css".to_string(),
            ]
        );
        // Reference page, two styles and one font.
        assert_eq!(fetcher.request_count(), 4);

        let github_css = std::fs::read_to_string(cache_path.join("github.css")).unwrap();
        assert_eq!(
            github_css,
            r#"@font-face{src:url("/__/grip/asset/static/fonts/octicons/octicons.woff?v=1")}"#
        );
        assert_eq!(std::fs::read(cache_path.join("octicons.woff")).unwrap(), vec![0, 1, 2, 3]);

        // Warm cache: same list, no network access.
        let mut warm = AssetManager::new(Some(cache_path.clone()), Vec::new(), fetcher.clone());
        assert_eq!(warm.retrieve_styles(ASSET_URL).await, urls);
        assert_eq!(warm.retrieve_styles(ASSET_URL).await, urls);
        assert_eq!(fetcher.request_count(), 4);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("cache");
        let fetcher = Arc::new(fetcher_with_styles());

        let mut assets = AssetManager::new(Some(cache_path.clone()), Vec::new(), fetcher.clone());
        assets.retrieve_styles(ASSET_URL).await;
        assert_eq!(fetcher.request_count(), 4);

        assets.clear().unwrap();
        assert!(!cache_path.exists());
        // Clearing twice is fine.
        assets.clear().unwrap();

        assets.retrieve_styles(ASSET_URL).await;
        assert_eq!(fetcher.request_count(), 8);
        assert!(cache_path.join("light.css").exists());
    }

    #[tokio::test]
    async fn test_partial_failure_caches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("cache");
        let fetcher = Arc::new(
            fetcher_with_styles().with("https://assets.example.com/light.css", 500, "oops"),
        );

        let mut assets = AssetManager::new(Some(cache_path.clone()), Vec::new(), fetcher.clone());
        let urls = assets.retrieve_styles(ASSET_URL).await;

        assert!(!cache_path.exists());
        // Falls back to linking the remote styles.
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("https://"));
    }

    #[tokio::test]
    async fn test_failed_font_download_caches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("cache");
        let fetcher = Arc::new(fetcher_with_styles().with(
            "https://assets.example.com/static/fonts/octicons/octicons.woff?v=1",
            500,
            "",
        ));

        let mut assets = AssetManager::new(Some(cache_path.clone()), Vec::new(), fetcher.clone());
        let urls = assets.retrieve_styles(ASSET_URL).await;

        assert!(!cache_path.exists());
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|url| url.starts_with("https://")));
    }

    #[test]
    fn test_cached_file_rejects_dot_segments() {
        let assets = AssetManager::new(
            Some(PathBuf::from("/tmp/grip-cache")),
            Vec::new(),
            Arc::new(FakeFetcher::default()),
        );

        assert_eq!(
            assets.cached_file("static/fonts/octicons.woff?v=1"),
            Some(PathBuf::from("/tmp/grip-cache/octicons.woff"))
        );
        assert_eq!(assets.cached_file("x/.."), None);
        assert_eq!(assets.cached_file("."), None);
        assert_eq!(assets.cached_file("dir/"), None);

        let uncached = AssetManager::new(None, Vec::new(), Arc::new(FakeFetcher::default()));
        assert_eq!(uncached.cached_file("light.css"), None);
    }

    #[tokio::test]
    async fn test_no_style_urls_leaves_list_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("cache");
        let fetcher = Arc::new(FakeFetcher::default().with(STYLE_URLS_SOURCE, 200, "<html></html>"));

        let initial = vec!["https://example.com/custom.css".to_string()];
        let mut assets = AssetManager::new(Some(cache_path.clone()), initial.clone(), fetcher);

        assert!(assets.retrieve_styles(ASSET_URL).await.is_empty());
        assert_eq!(assets.style_urls, initial);
        assert!(!cache_path.exists());
    }

    #[tokio::test]
    async fn test_network_error_is_contained() {
        let fetcher = Arc::new(FakeFetcher::default().failing(STYLE_URLS_SOURCE));
        let mut assets = AssetManager::new(None, Vec::new(), fetcher);

        assert!(assets.retrieve_styles(ASSET_URL).await.is_empty());
        assert!(assets.style_urls.is_empty());
    }

    #[tokio::test]
    async fn test_inline_styles_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_path = tmp.path().join("cache");
        let fetcher = Arc::new(fetcher_with_styles());

        let mut assets = AssetManager::new(Some(cache_path), Vec::new(), fetcher);
        assets.retrieve_styles(ASSET_URL).await;
        assets.inline_styles(ASSET_URL).await;

        assert!(assets.style_urls.is_empty());
        assert_eq!(assets.styles.len(), 2);
        assert_eq!(
            assets.styles[0],
            format!(
                "@font-face{{src:url(data:font/woff;base64,{})}}",
                base64::engine::general_purpose::STANDARD.encode([0u8, 1, 2, 3])
            )
        );
        assert_eq!(assets.styles[1], "body{color:#000}");
    }

    #[tokio::test]
    async fn test_inline_remote_styles() {
        let fetcher = Arc::new(fetcher_with_styles());
        let mut assets = AssetManager::new(
            None,
            vec!["https://assets.example.com/github.css?v=3".to_string()],
            fetcher,
        );

        assets.inline_styles(ASSET_URL).await;

        assert_eq!(assets.styles.len(), 1);
        assert!(assets.styles[0].contains("data:font/woff;base64,AAECAw=="));
    }
}
