//! Accepting uploaded files and storing them under a safe name.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Why an upload was refused. Each variant maps to the flash message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The form had no `file` field.
    NoFilePart,
    /// Empty filename, disallowed extension, or a name with no safe characters.
    InvalidFile,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::NoFilePart => "No file part",
            Rejection::InvalidFile => "Invalid file",
        }
    }
}

/// True when the text after the last `.` is one of `allowed` (case-insensitive).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        }
        None => false,
    }
}

/// Reduce a client-supplied filename to something safe to join onto a directory.
///
/// Accented letters are decomposed (NFKD) so their ASCII base survives.
/// Path separators become spaces, whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are stripped.
/// The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let decomposed: String = filename.nfkd().collect();
    let spaced = decomposed.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Validate the filename of an uploaded `file` field and return its sanitized form.
///
/// `filename` is `None` when the form had no `file` field at all.
pub fn accept_upload(filename: Option<&str>, allowed: &[String]) -> std::result::Result<String, Rejection> {
    let filename = filename.ok_or(Rejection::NoFilePart)?;
    if filename.is_empty() || !allowed_file(filename, allowed) {
        return Err(Rejection::InvalidFile);
    }

    let safe = secure_filename(filename);
    if safe.is_empty() {
        return Err(Rejection::InvalidFile);
    }
    Ok(safe)
}

/// The directory holding uploaded files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it is missing.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| Error::Io {
            path: self.root.clone(),
            source,
        })
    }

    /// Path of a stored file. The name is sanitized first, so a route
    /// parameter cannot point outside the directory.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(secure_filename(filename))
    }

    /// Write `bytes` under the sanitized `filename`, replacing any earlier file of that name.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = secure_filename(filename);
        if name.is_empty() {
            return Err(Error::Upload(format!("unusable filename '{}'", filename)));
        }

        let path = self.root.join(&name);
        fs::write(&path, bytes).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "stored upload");
        Ok(path)
    }
}
