//! Readme sources.
//!
//! A reader turns a URL subpath into README content. `None` always refers to
//! the root README, subpaths are only meaningful for [`DirectoryReader`].

use crate::constants::{DEFAULT_FILENAME, DEFAULT_FILENAMES};
use crate::document::{is_binary_mimetype, mimetype_for};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::io::{ErrorKind, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("No README found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// The subpath escapes the root directory or is not supported by the reader.
    #[error("Invalid subpath: {0}")]
    InvalidSubpath(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReadError {
    /// Whether this error should surface as a 404.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Content of a README or of a file next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

/// Reads Readme content from a URL subpath.
pub trait ReadmeReader: Send + Sync {
    /// Returns the normalized subpath.
    ///
    /// This allows Readme files to be inferred from directories while still
    /// allowing relative paths to work properly.
    fn normalize_subpath(&self, subpath: Option<&str>) -> Option<String> {
        subpath.map(normpath)
    }

    /// Returns the relative filename for display, `None` if unknown.
    fn filename_for(&self, _subpath: Option<&str>) -> Option<String> {
        None
    }

    fn mimetype_for(&self, subpath: Option<&str>) -> Option<&'static str> {
        mimetype_for(Path::new(subpath.unwrap_or(DEFAULT_FILENAME)))
    }

    /// Whether the subpath is a supported binary file.
    fn is_binary(&self, _subpath: Option<&str>) -> bool {
        false
    }

    /// Modification marker of the subpath, `None` if the file does not exist
    /// or the reader does not track modifications.
    fn last_updated(&self, _subpath: Option<&str>) -> Option<SystemTime> {
        None
    }

    fn read(&self, subpath: Option<&str>) -> Result<Content, ReadError>;
}

/// Normalizes a `/`-separated path the way `posixpath.normpath` does.
///
/// ```
/// use grip_core::reader::normpath;
///
/// assert_eq!(normpath("docs//./guide/../intro.md"), "docs/intro.md");
/// assert_eq!(normpath("/a/../../b"), "/b");
/// assert_eq!(normpath(""), ".");
/// ```
pub fn normpath(path: &str) -> String {
    let absolute = path.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".into()
    } else {
        joined
    }
}

/// Joins an untrusted subpath onto `directory`, `None` if it would escape it.
pub fn safe_join(directory: &Path, subpath: &str) -> Option<PathBuf> {
    let normalized = normpath(subpath);
    if normalized.starts_with('/')
        || normalized == ".."
        || normalized.starts_with("../")
        || normalized.contains('\\')
    {
        return None;
    }
    if normalized == "." {
        return Some(directory.to_path_buf());
    }
    Some(directory.join(normalized))
}

/// Makes `path` absolute against the current directory and drops `.`/`..`.
fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Reads Readme files from URL subpaths.
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    root_filename: PathBuf,
    root_directory: PathBuf,
}

impl DirectoryReader {
    /// Resolves the root README.
    ///
    /// `path` is either a file or a directory containing one of the
    /// [`DEFAULT_FILENAMES`], the current directory when `None`. With `silent`
    /// set, a missing README resolves to `<path>/README.md` instead of failing.
    pub fn new(path: Option<&Path>, silent: bool) -> Result<Self, ReadError> {
        let resolved = resolve_readme(path, silent)?;
        let root_filename = absolutize(&resolved)?;
        let root_directory = root_filename
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok(Self {
            root_filename,
            root_directory,
        })
    }

    pub fn root_filename(&self) -> &Path {
        &self.root_filename
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Returns the full path of the README for `subpath`.
    pub fn readme_for(&self, subpath: Option<&str>) -> Result<PathBuf, ReadError> {
        let Some(subpath) = subpath else {
            return Ok(self.root_filename.clone());
        };

        let filename = safe_join(&self.root_directory, subpath)
            .ok_or_else(|| ReadError::InvalidSubpath(subpath.to_string()))?;

        if !filename.exists() {
            return Err(ReadError::NotFound(filename));
        }

        if filename.is_dir() {
            return find_file(&filename, false);
        }

        Ok(filename)
    }
}

fn find_file(dir: &Path, silent: bool) -> Result<PathBuf, ReadError> {
    if let Some(found) = DEFAULT_FILENAMES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|full_path| full_path.exists())
    {
        return Ok(found);
    }

    if silent {
        return Ok(dir.join(DEFAULT_FILENAME));
    }

    Err(ReadError::NotFound(dir.to_path_buf()))
}

fn resolve_readme(path: Option<&Path>, silent: bool) -> Result<PathBuf, ReadError> {
    let path = path.unwrap_or_else(|| Path::new("."));

    if path.is_dir() {
        return find_file(path, silent);
    }

    if silent || path.exists() {
        return Ok(path.to_path_buf());
    }

    Err(ReadError::FileNotFound(path.to_path_buf()))
}

impl ReadmeReader for DirectoryReader {
    fn normalize_subpath(&self, subpath: Option<&str>) -> Option<String> {
        let subpath = subpath?;

        let normalized = normpath(subpath);
        if normalized == "." {
            return Some(String::new());
        }

        // Add a trailing slash to directories so relative links keep working.
        match safe_join(&self.root_directory, &normalized) {
            Some(filename) if filename.is_dir() => Some(format!("{normalized}/")),
            _ => Some(normalized),
        }
    }

    fn filename_for(&self, subpath: Option<&str>) -> Option<String> {
        let filename = self.readme_for(subpath).ok()?;
        let relative = filename
            .strip_prefix(&self.root_directory)
            .unwrap_or(&filename);
        Some(relative.to_string_lossy().into_owned())
    }

    fn is_binary(&self, subpath: Option<&str>) -> bool {
        is_binary_mimetype(self.mimetype_for(subpath))
    }

    fn last_updated(&self, subpath: Option<&str>) -> Option<SystemTime> {
        let filename = self.readme_for(subpath).ok()?;
        std::fs::metadata(filename).and_then(|m| m.modified()).ok()
    }

    fn read(&self, subpath: Option<&str>) -> Result<Content, ReadError> {
        let is_binary = self.is_binary(subpath);
        let filename = self.readme_for(subpath)?;

        let not_found = |err: std::io::Error| {
            if err.kind() == ErrorKind::NotFound {
                ReadError::NotFound(filename.clone())
            } else {
                ReadError::Io(err)
            }
        };

        if is_binary {
            std::fs::read(&filename).map(Content::Binary).map_err(not_found)
        } else {
            std::fs::read_to_string(&filename)
                .map(Content::Text)
                .map_err(not_found)
        }
    }
}

/// Reads Readme content from the provided string.
#[derive(Debug, Clone)]
pub struct TextReader {
    text: String,
    display_filename: Option<String>,
}

impl TextReader {
    pub fn new(text: impl Into<String>, display_filename: Option<String>) -> Self {
        Self {
            text: text.into(),
            display_filename,
        }
    }
}

impl ReadmeReader for TextReader {
    fn filename_for(&self, subpath: Option<&str>) -> Option<String> {
        match subpath {
            Some(_) => None,
            None => self.display_filename.clone(),
        }
    }

    fn read(&self, subpath: Option<&str>) -> Result<Content, ReadError> {
        match subpath {
            Some(subpath) => Err(ReadError::InvalidSubpath(subpath.to_string())),
            None => Ok(Content::Text(self.text.clone())),
        }
    }
}

/// Reads Readme text from stdin, lazily and only once.
pub struct StdinReader {
    text: OnceCell<String>,
    display_filename: Option<String>,
    source: Mutex<Box<dyn Read + Send>>,
}

impl StdinReader {
    pub fn new(display_filename: Option<String>) -> Self {
        Self::from_source(std::io::stdin(), display_filename)
    }

    /// Reads from `source` instead of the process stdin.
    pub fn from_source(source: impl Read + Send + 'static, display_filename: Option<String>) -> Self {
        Self {
            text: OnceCell::new(),
            display_filename,
            source: Mutex::new(Box::new(source)),
        }
    }
}

impl ReadmeReader for StdinReader {
    fn filename_for(&self, subpath: Option<&str>) -> Option<String> {
        match subpath {
            Some(_) => None,
            None => self.display_filename.clone(),
        }
    }

    fn read(&self, subpath: Option<&str>) -> Result<Content, ReadError> {
        if let Some(subpath) = subpath {
            return Err(ReadError::InvalidSubpath(subpath.to_string()));
        }

        let text = self.text.get_or_try_init(|| {
            let mut text = String::new();
            self.source.lock().read_to_string(&mut text)?;
            Ok::<_, std::io::Error>(text)
        })?;

        Ok(Content::Text(text.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normpath() {
        assert_eq!(normpath("a/b/"), "a/b");
        assert_eq!(normpath("./a"), "a");
        assert_eq!(normpath("a/../.."), "..");
        assert_eq!(normpath("/.."), "/");
        assert_eq!(normpath("."), ".");
    }

    #[test]
    fn test_safe_join_rejects_escapes() {
        let root = Path::new("/root/project");
        assert_eq!(safe_join(root, "docs/a.md"), Some(root.join("docs/a.md")));
        assert_eq!(safe_join(root, "docs/../a.md"), Some(root.join("a.md")));
        assert_eq!(safe_join(root, "."), Some(root.to_path_buf()));
        assert!(safe_join(root, "../secret").is_none());
        assert!(safe_join(root, "/etc/passwd").is_none());
        assert!(safe_join(root, "docs/../../x").is_none());
    }

    #[test]
    fn test_directory_reader_resolution_order() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Home.md"), "home").unwrap();
        std::fs::write(tmp.path().join("readme.markdown"), "readme").unwrap();

        let reader = DirectoryReader::new(Some(tmp.path()), false).unwrap();
        assert_eq!(
            reader.read(None).unwrap(),
            Content::Text("readme".to_string())
        );
    }

    #[test]
    fn test_directory_reader_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DirectoryReader::new(Some(tmp.path()), false).unwrap_err();
        assert!(matches!(err, ReadError::NotFound(_)));

        let missing = tmp.path().join("missing.md");
        let err = DirectoryReader::new(Some(&missing), false).unwrap_err();
        assert!(matches!(err, ReadError::FileNotFound(_)));
        assert!(err.to_string().starts_with("File not found: "));

        let reader = DirectoryReader::new(Some(tmp.path()), true).unwrap();
        assert!(reader.root_filename().ends_with(DEFAULT_FILENAME));
    }

    #[test]
    fn test_directory_reader_subpaths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("README.md"), "# Root").unwrap();
        std::fs::create_dir(tmp.path().join("docs")).unwrap();
        std::fs::write(tmp.path().join("docs").join("README.md"), "# Docs").unwrap();
        std::fs::write(tmp.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let reader = DirectoryReader::new(Some(tmp.path()), false).unwrap();

        assert_eq!(reader.normalize_subpath(None), None);
        assert_eq!(reader.normalize_subpath(Some("docs")), Some("docs/".to_string()));
        assert_eq!(reader.normalize_subpath(Some("docs/")), Some("docs/".to_string()));
        assert_eq!(reader.normalize_subpath(Some("./")), Some(String::new()));

        assert_eq!(
            reader.read(Some("docs/")).unwrap(),
            Content::Text("# Docs".to_string())
        );
        assert_eq!(reader.filename_for(None), Some("README.md".to_string()));
        assert_eq!(
            reader.filename_for(Some("docs/")),
            Some(Path::new("docs").join("README.md").to_string_lossy().into_owned())
        );

        assert!(reader.is_binary(Some("logo.png")));
        assert!(!reader.is_binary(None));
        assert_eq!(
            reader.read(Some("logo.png")).unwrap(),
            Content::Binary(vec![0x89, b'P', b'N', b'G'])
        );

        assert!(reader.read(Some("nope.md")).unwrap_err().is_not_found());
        assert!(reader.read(Some("../escape.md")).unwrap_err().is_not_found());
        assert!(reader.last_updated(None).is_some());
        assert!(reader.last_updated(Some("nope.md")).is_none());
    }

    #[test]
    fn test_text_reader() {
        let reader = TextReader::new("# Hi", Some("README.md".into()));
        assert_eq!(reader.read(None).unwrap(), Content::Text("# Hi".into()));
        assert_eq!(reader.filename_for(None), Some("README.md".into()));
        assert!(reader.read(Some("other.md")).unwrap_err().is_not_found());
        assert!(reader.last_updated(None).is_none());
    }

    #[test]
    fn test_stdin_reader_reads_once() {
        let reader = StdinReader::from_source(std::io::Cursor::new("from stdin"), None);
        assert_eq!(reader.read(None).unwrap(), Content::Text("from stdin".into()));
        // The source is drained, the cached text is returned again.
        assert_eq!(reader.read(None).unwrap(), Content::Text("from stdin".into()));
        assert!(reader.read(Some("x")).is_err());
    }
}
