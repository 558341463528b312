//! Plain text extraction from files.
//!
//! The content type comes from the caller or, failing that, from the file
//! extension. Text-like types are decoded as UTF-8 and markup is stripped;
//! anything else is accepted only when its bytes are valid UTF-8.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use url::Url;
use walkdir::WalkDir;

use crate::error::{QuireError, Result};

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<script\b.*?</script>|<style\b.*?</style>|<[^>]*>")
        .expect("tag pattern compiles")
});

static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(amp|lt|gt|quot|apos|nbsp|#[0-9]+);").expect("entity pattern compiles")
});

/// How a file's bytes become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Plain text, read as is.
    Plain,
    /// HTML or XML, tags removed.
    Markup,
    /// Unknown type, read as is if the bytes are UTF-8.
    Sniffed,
    /// Binary content that cannot be indexed.
    Binary,
}

/// Classify a MIME type string.
pub fn classify(mime: &str) -> TextKind {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let (top, sub) = essence.split_once('/').unwrap_or((essence.as_str(), ""));

    if sub == "html" || sub == "xhtml+xml" || sub == "xml" || sub.ends_with("+xml") {
        return TextKind::Markup;
    }
    match top {
        "text" => TextKind::Plain,
        "application" if sub == "json" || sub.ends_with("+json") || sub == "javascript" => {
            TextKind::Plain
        }
        "application" if sub == "octet-stream" => TextKind::Sniffed,
        "" => TextKind::Sniffed,
        _ => TextKind::Binary,
    }
}

/// Guess the MIME type of a path from its extension.
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Remove tags and decode the common entities.
pub fn strip_markup(text: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(text, " ");
    ENTITY_PATTERN
        .replace_all(&stripped, |caps: &regex::Captures<'_>| match &caps[1] {
            "amp" => "&".to_string(),
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            "nbsp" => " ".to_string(),
            code => code[1..]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default(),
        })
        .into_owned()
}

/// Read the text content of a file.
///
/// `mime` overrides the type guessed from the extension.
pub fn extract_text(path: &Path, mime: Option<&str>) -> Result<String> {
    let mime = match mime {
        Some(mime) if !mime.trim().is_empty() => mime.to_string(),
        _ => guess_mime(path),
    };
    let kind = classify(&mime);
    if kind == TextKind::Binary {
        return Err(QuireError::unsupported(format!(
            "{}: cannot extract text from {mime}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => QuireError::not_found(path.display().to_string()),
        _ => QuireError::Io(e),
    })?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) if kind == TextKind::Sniffed => {
            return Err(QuireError::unsupported(format!(
                "{}: content is not text",
                path.display()
            )));
        }
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };

    Ok(match kind {
        TextKind::Markup => strip_markup(&text),
        _ => text,
    })
}

/// The `file://` URL used as the URI of an indexed file.
pub fn file_uri(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => QuireError::not_found(path.display().to_string()),
        _ => QuireError::Io(e),
    })?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| QuireError::invalid_argument(format!("{}: not a file path", absolute.display())))
}

/// A file read for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub uri: String,
    pub text: String,
}

/// Extract every regular file under `root`, in parallel.
///
/// Files that cannot be read or are not text are skipped with a warning.
/// Results are ordered by path. A `root` that is not a directory yields
/// nothing.
pub fn extract_folder(root: &Path) -> Vec<ExtractedFile> {
    list_files(root)
        .par_iter()
        .filter_map(|path| {
            let extracted = extract_text(path, None).and_then(|text| {
                Ok(ExtractedFile {
                    path: path.clone(),
                    uri: file_uri(path)?,
                    text,
                })
            });
            match extracted {
                Ok(file) => Some(file),
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    None
                }
            }
        })
        .collect()
}

/// Regular files under `root`, recursively, sorted by path.
///
/// A `root` that is not a directory yields nothing.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {e}", root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}
