use once_cell::sync::Lazy;
use regex::Regex;

/// The common titles and supported extensions, as defined by
/// <https://github.com/github/markup>.
pub const SUPPORTED_TITLES: &[&str] = &["README", "Readme", "readme", "Home"];
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".md", ".markdown"];

/// The filenames tried, in order, when a directory is given.
pub static DEFAULT_FILENAMES: Lazy<Vec<String>> = Lazy::new(|| {
    SUPPORTED_TITLES
        .iter()
        .flat_map(|title| SUPPORTED_EXTENSIONS.iter().map(move |ext| format!("{title}{ext}")))
        .collect()
});

/// The default filename when no file is provided.
pub const DEFAULT_FILENAME: &str = "README.md";

/// The default URL prefix of the grip routes.
pub const DEFAULT_GRIPURL: &str = "/__/grip";

/// Environment variable overriding [`DEFAULT_GRIPURL`].
pub const GRIPURL_ENV: &str = "GRIPURL";

/// The public GitHub API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Page scanned for the stylesheets GitHub uses to render READMEs.
pub const STYLE_URLS_SOURCE: &str = "https://github.com/joeyespo/grip";

/// Stylesheet `<link>` patterns, `href` before and after `rel`.
pub static STYLE_URLS_RES: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r#"<link\b[^>]+\bhref=['"]?([^'" >]+)['"]?[^>]*\brel=['"]?stylesheet['"]?[^>]*>"#)
            .expect("Invalid style url regex"),
        Regex::new(r#"<link\b[^>]+\brel=['"]?stylesheet['"]?[^>]*\bhref=['"]?([^'" >]+)['"]?[^>]*>"#)
            .expect("Invalid style url regex"),
    ]
});

/// Font assets referenced from the GitHub stylesheets.
pub static STYLE_ASSET_URLS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(['"]?(/static/fonts/octicons/[^'" \)]+)['"]?\)"#)
        .expect("Invalid style asset regex")
});

/// Pattern of the asset references inlined on export, `{asset_url}` being the
/// escaped asset route.
pub fn style_asset_urls_inline_re(asset_url: &str) -> Regex {
    Regex::new(&format!(
        r#"url\(['"]?((?:/static|{})/[^'" \)]+)['"]?\)"#,
        regex::escape(asset_url)
    ))
    .expect("Invalid inline asset regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filenames_order() {
        assert_eq!(DEFAULT_FILENAMES[0], DEFAULT_FILENAME);
        assert_eq!(DEFAULT_FILENAMES[1], "README.markdown");
        assert_eq!(DEFAULT_FILENAMES.last().map(String::as_str), Some("Home.markdown"));
        assert_eq!(DEFAULT_FILENAMES.len(), 8);
    }

    #[test]
    fn test_style_url_patterns() {
        let html = r#"<link crossorigin="anonymous" media="all" href="https://github.githubassets.com/assets/light.css" rel="stylesheet" />
<link rel="stylesheet" crossorigin="anonymous" href="https://github.githubassets.com/assets/github.css" media="all" />"#;

        let urls: Vec<&str> = STYLE_URLS_RES
            .iter()
            .flat_map(|re| re.captures_iter(html))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        assert_eq!(
            urls,
            vec![
                "https://github.githubassets.com/assets/light.css",
                "https://github.githubassets.com/assets/github.css",
            ]
        );
    }

    #[test]
    fn test_inline_pattern_matches_both_prefixes() {
        let re = style_asset_urls_inline_re("/__/grip/asset");
        assert!(re.is_match("url(/static/fonts/a.woff)"));
        assert!(re.is_match(r#"url("/__/grip/asset/static/fonts/octicons/b.woff")"#));
        assert!(!re.is_match("url(https://cdn.example.com/c.woff)"));
    }
}
