use super::{Auth, ReadmeRenderer, RenderError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;

/// Bare links in text: schemes, `www.` hosts and a few common top level domains.
static URLIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:f|ht)tps?://[^)<>\s]+[^.,)<>\s]",
        r"|\bwww\.[^)<>\s]+[^.,)<>\s]",
        r"|[^(<\s]+\.(?:com|net|org)\b",
    ))
    .expect("Invalid urlize regex")
});

/// Renders the Readme locally, without the GitHub API.
///
/// The output approximates GitHub: tables, strikethrough, task lists,
/// footnotes, heading anchors and autolinked URLs.
#[derive(Debug, Clone, Default)]
pub struct OfflineRenderer {
    user_content: bool,
}

impl OfflineRenderer {
    pub fn new(user_content: bool) -> Self {
        Self { user_content }
    }
}

#[async_trait]
impl ReadmeRenderer for OfflineRenderer {
    fn user_content(&self) -> bool {
        self.user_content
    }

    async fn render(&self, text: &str, _auth: Option<&Auth>) -> Result<String, RenderError> {
        Ok(to_html(text))
    }
}

/// Turns heading text into an anchor id the way GitHub does.
///
/// ```
/// use grip_core::render::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("API  v2"), "api--v2");
/// ```
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                Some(c)
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// Hands out unique ids, repeated slugs get `_1`, `_2`, ... appended.
#[derive(Debug, Default)]
struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    fn unique(&mut self, slug: String) -> String {
        let mut id = slug.clone();
        let mut n = 1;
        while self.used.contains(&id) {
            id = format!("{slug}_{n}");
            n += 1;
        }
        self.used.insert(id.clone());
        id
    }
}

fn link_target(text: &str) -> String {
    if let Some((scheme, _)) = text.split_once("://") {
        if matches!(scheme, "http" | "https" | "ftp" | "ftps") {
            return text.to_string();
        }
    }
    if text.contains('@') && !text.contains('/') {
        format!("mailto:{text}")
    } else {
        format!("http://{text}")
    }
}

/// Splits `text` into plain text and autolink events.
fn urlize<'a>(text: &str) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    let mut last = 0;

    for m in URLIZE_RE.find_iter(text) {
        if m.start() > last {
            events.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
        }
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(link_target(m.as_str())),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        events.push(Event::Text(CowStr::from(m.as_str().to_string())));
        events.push(Event::End(TagEnd::Link));
        last = m.end();
    }

    if last < text.len() {
        events.push(Event::Text(CowStr::from(text[last..].to_string())));
    }

    events
}

fn flush_text<'a>(pending: &mut String, out: &mut Vec<Event<'a>>) {
    if !pending.is_empty() {
        out.extend(urlize(pending));
        pending.clear();
    }
}

fn pulldown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Renders `markdown_content` to an HTML fragment.
fn to_html(markdown_content: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(markdown_content, pulldown_options()).collect();

    let mut processed_events: Vec<Event> = Vec::with_capacity(events.len());
    let mut ids = HeadingIds::default();
    let mut link_depth = 0usize;
    let mut in_code_block = false;
    let mut pending_text = String::new();

    let mut i = 0;
    while i < events.len() {
        let event = &events[i];

        // Consecutive text is merged so that URLs split by the parser are
        // matched whole.
        if let Event::Text(text) = event {
            if link_depth == 0 && !in_code_block {
                pending_text.push_str(text);
                i += 1;
                continue;
            }
        }
        flush_text(&mut pending_text, &mut processed_events);

        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let id = match id {
                    Some(id) => ids.unique(id.to_string()),
                    None => {
                        let mut heading_text = String::new();
                        for next in &events[i + 1..] {
                            match next {
                                Event::Text(text) | Event::Code(text) => heading_text.push_str(text),
                                Event::End(TagEnd::Heading(_)) => break,
                                _ => {}
                            }
                        }
                        ids.unique(slugify(&heading_text))
                    }
                };

                processed_events.push(Event::Start(Tag::Heading {
                    level: *level,
                    id: Some(id.into()),
                    classes: classes.clone(),
                    attrs: attrs.clone(),
                }));
            }
            Event::Start(Tag::Link { .. }) => {
                link_depth += 1;
                processed_events.push(event.clone());
            }
            Event::End(TagEnd::Link) => {
                link_depth = link_depth.saturating_sub(1);
                processed_events.push(event.clone());
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                processed_events.push(Event::Html(CowStr::from("<div class=\"highlight\">")));
                processed_events.push(event.clone());
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                processed_events.push(event.clone());
                processed_events.push(Event::Html(CowStr::from("</div>\n")));
            }
            _ => processed_events.push(event.clone()),
        }

        i += 1;
    }
    flush_text(&mut pending_text, &mut processed_events);

    let mut html_output = String::with_capacity(markdown_content.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html_output, processed_events.into_iter());
    html_output
}
