//! Mimetype detection for files served next to the README.
//!
//! Anything with a known, non-`text/*` mimetype is treated as binary and
//! served as-is instead of being rendered.

use std::path::Path;

/// Extension to mimetype table, extensions are lowercase and without the dot.
const MIMETYPES: &[(&str, &str)] = &[
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("xml", "text/xml"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/x-wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("woff", "application/x-font-woff"),
    ("woff2", "font/woff2"),
    ("ttf", "application/octet-stream"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
];

/// Guesses the mimetype from the extension of `path` (case-insensitive).
///
/// # Examples
///
/// ```
/// use grip_core::document::mimetype_for;
/// use std::path::Path;
///
/// assert_eq!(mimetype_for(Path::new("logo.PNG")), Some("image/png"));
/// assert_eq!(mimetype_for(Path::new("README")), None);
/// ```
pub fn mimetype_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    MIMETYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mimetype)| *mimetype)
}

/// Returns `true` if the mimetype is known and not textual.
pub fn is_binary_mimetype(mimetype: Option<&str>) -> bool {
    mimetype.is_some_and(|m| !m.starts_with("text/"))
}
