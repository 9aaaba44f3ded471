//! Fixes for the HTML returned by the GitHub API where it differs from
//! github.com.

use once_cell::sync::Lazy;
use regex::Regex;

static INCOMPLETE_TASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<li>\[ \] (.*?)(<ul.*?>|</li>)").expect("Invalid task list regex")
});
const INCOMPLETE_TASK_SUB: &str = r#"<li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox" disabled=""> ${1}${2}"#;

static COMPLETE_TASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<li>\[x\] (.*?)(<ul.*?>|</li>)").expect("Invalid task list regex")
});
const COMPLETE_TASK_SUB: &str = r#"<li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox" checked="" disabled=""> ${1}${2}"#;

static HEADER_PATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span>\{:"aria-hidden"=&gt;"true", :class=&gt;"octicon octicon-link"\}</span>"#)
        .expect("Invalid header patch regex")
});
const HEADER_PATCH_SUB: &str = r#"<span class="octicon octicon-link"></span>"#;

/// Patches the HTML rendered by the GitHub API.
///
/// The raw endpoint leaves task lists as plain text, user content already has
/// them.
pub fn patch(html: &str, user_content: bool) -> String {
    let mut html = html.to_string();

    if !user_content {
        html = INCOMPLETE_TASK_RE
            .replace_all(&html, INCOMPLETE_TASK_SUB)
            .into_owned();
        html = COMPLETE_TASK_RE
            .replace_all(&html, COMPLETE_TASK_SUB)
            .into_owned();
    }

    HEADER_PATCH_RE
        .replace_all(&html, HEADER_PATCH_SUB)
        .into_owned()
}
