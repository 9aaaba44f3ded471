//! HTML pages served around the rendered Readme.
//!
//! The templates are plain HTML with `__NAME__` placeholders, filled in by
//! [`render_index`] and [`render_rate_limit`].

use std::fmt;
use std::str::FromStr;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const LIMIT_TEMPLATE: &str = include_str!("../templates/limit.html");
const REFRESH_JS: &str = include_str!("../templates/refresh.js");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme `{other}`, expected `light` or `dark`")),
        }
    }
}

/// Everything shown on a Readme page.
#[derive(Debug, Clone, Default)]
pub struct PageContext<'a> {
    pub filename: Option<&'a str>,
    pub title: Option<&'a str>,
    /// Rendered HTML, inserted as is.
    pub content: &'a str,
    pub user_content: bool,
    pub wide: bool,
    pub style_urls: &'a [String],
    pub styles: &'a [String],
    pub autorefresh_url: Option<&'a str>,
    pub theme: Theme,
}

impl PageContext<'_> {
    /// The explicit title, `<filename> - Grip` otherwise.
    pub fn page_title(&self) -> String {
        match (self.title, self.filename) {
            (Some(title), _) => title.to_string(),
            (None, Some(filename)) => format!("{filename} - Grip"),
            (None, None) => "Grip".to_string(),
        }
    }
}

/// Escapes the characters significant in HTML text and attributes.
///
/// ```
/// use grip_core::page::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn body(ctx: &PageContext) -> String {
    if ctx.user_content {
        format!(
            r#"    <div class="comment">
      <div class="comment-body markdown-body">
{}
      </div>
    </div>"#,
            ctx.content
        )
    } else {
        let header = ctx
            .filename
            .map(|filename| format!("      <h3 class=\"readme-header\">{}</h3>\n", escape_html(filename)))
            .unwrap_or_default();
        format!(
            r#"    <div id="readme" class="readme">
{header}      <article class="markdown-body entry-content" itemprop="text">
{}
      </article>
    </div>"#,
            ctx.content
        )
    }
}

/// Renders the Readme page.
pub fn render_index(ctx: &PageContext) -> String {
    let style_links = ctx
        .style_urls
        .iter()
        .map(|url| format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(url)))
        .collect::<Vec<_>>()
        .join("\n  ");

    let styles = ctx
        .styles
        .iter()
        .map(|style| format!("<style>{style}</style>"))
        .collect::<Vec<_>>()
        .join("\n  ");

    let script = ctx
        .autorefresh_url
        .map(|url| {
            let js = REFRESH_JS.replace("__AUTOREFRESH_URL__", &escape_js(url));
            format!("<script>\n{js}</script>")
        })
        .unwrap_or_default();

    // The content goes in last so that nothing in the Readme is mistaken
    // for a placeholder.
    INDEX_TEMPLATE
        .replace("__COLOR_MODE__", ctx.theme.as_str())
        .replace("__TITLE__", &escape_html(&ctx.page_title()))
        .replace("__WIDE_CLASS__", if ctx.wide { " wide" } else { "" })
        .replace("<!--__STYLE_LINKS__-->", &style_links)
        .replace("<!--__STYLES__-->", &styles)
        .replace("<!--__AUTOREFRESH_SCRIPT__-->", &script)
        .replace("<!--__BODY__-->", &body(ctx))
}

/// Renders the page shown once the GitHub API rate limit is hit.
pub fn render_rate_limit(is_authenticated: bool) -> String {
    let message = if is_authenticated {
        "  <p>\n    The limit also applies to authenticated requests. Wait for the \
         limit to reset, usually within an hour.\n  </p>"
    } else {
        "  <p>\n    Unauthenticated requests are limited to 60 per hour. Pass your GitHub \
         username with <code>--user</code> and a personal access token with \
         <code>--pass</code> to raise the limit.\n  </p>"
    };
    LIMIT_TEMPLATE.replace("<!--__MESSAGE__-->", message)
}

fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('<', "\\x3c")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readme_page() {
        let style_urls = vec!["/__/grip/asset/github.css".to_string()];
        let ctx = PageContext {
            filename: Some("README.md"),
            content: "<h1>Hi</h1>",
            style_urls: &style_urls,
            autorefresh_url: Some("/__/grip/refresh/"),
            ..Default::default()
        };
        let html = render_index(&ctx);

        assert!(html.contains("<title>README.md - Grip</title>"));
        assert!(html.contains(r#"<h3 class="readme-header">README.md</h3>"#));
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains(r#"<link rel="stylesheet" href="/__/grip/asset/github.css">"#));
        assert!(html.contains("new EventSource('/__/grip/refresh/')"));
        assert!(html.contains(r#"data-color-mode="light""#));
        assert!(html.contains(r#"<div class="page">"#));
        assert!(!html.contains("<!--__"), "unfilled placeholder in {html}");
        assert!(!html.contains("__TITLE__"));
    }

    #[test]
    fn test_user_content_page() {
        let styles = vec!["body{}".to_string()];
        let ctx = PageContext {
            title: Some("<Notes>"),
            content: "<p>__TITLE__</p>",
            user_content: true,
            wide: true,
            styles: &styles,
            theme: Theme::Dark,
            ..Default::default()
        };
        let html = render_index(&ctx);

        assert!(html.contains("<title>&lt;Notes&gt;</title>"));
        assert!(html.contains("comment-body markdown-body"));
        assert!(html.contains("<p>__TITLE__</p>"));
        assert!(html.contains("<style>body{}</style>"));
        assert!(html.contains(r#"<div class="page wide">"#));
        assert!(html.contains(r#"data-color-mode="dark""#));
        assert!(!html.contains("EventSource"));
    }

    #[test]
    fn test_rate_limit_page() {
        assert!(render_rate_limit(false).contains("--user"));
        assert!(render_rate_limit(true).contains("authenticated requests"));
        assert!(!render_rate_limit(true).contains("<!--__MESSAGE__-->"));
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("blue".parse::<Theme>().is_err());
    }
}
