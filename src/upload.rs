//! Uploaded audio and its transient on-disk copy.
//!
//! The Whisper endpoint needs a file, so each upload is written to the scratch
//! directory for the duration of one request. [`TransientFile`] owns that path
//! and removes it when released or dropped.

use crate::error::{KanguiError, Result};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// File extensions accepted by the upload surface.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "ogg", "flac", "mpga", "mpeg", "webm",
];

/// Check whether a file name has a supported audio extension.
pub fn is_supported_audio(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce a client-supplied file name to a safe base name.
///
/// Directory components are dropped; alphanumerics, `.` and `_` are kept and
/// everything else becomes `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let safe: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' { c } else { '_' })
        .collect();

    if safe.is_empty() {
        "upload".to_string()
    } else {
        safe
    }
}

/// An uploaded audio file held in memory.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    /// Name as declared by the client.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a local file as if it had been uploaded.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KanguiError::InvalidInput(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }

    /// Reject names without a supported audio extension.
    pub fn ensure_supported(&self) -> Result<()> {
        if is_supported_audio(&self.file_name) {
            Ok(())
        } else {
            Err(KanguiError::UnsupportedAudio(format!(
                "{} (supported: {})",
                self.file_name,
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn summary(&self) -> UploadSummary {
        UploadSummary {
            file_name: self.file_name.clone(),
            size_bytes: self.size(),
        }
    }
}

/// Name and size of an upload, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub file_name: String,
    pub size_bytes: usize,
}

impl UploadSummary {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }

    /// Status line shown once the upload has been stored.
    pub fn status_line(&self) -> String {
        format!("'{}' 파일 업로드 완료 ({:.2} MB).", self.file_name, self.size_mb())
    }
}

/// A scratch file that lives for one request.
///
/// Call [`TransientFile::release`] to remove it and observe any error.
/// If the guard is dropped without being released, removal is still
/// attempted and a failure is only logged.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    released: bool,
}

impl TransientFile {
    /// Reserve a unique path for `file_name` under `dir`. Nothing is written yet.
    pub fn reserve(dir: &Path, file_name: &str) -> Self {
        let unique = Uuid::new_v4().simple().to_string();
        let name = format!("{}_{}", &unique[..12], sanitize_file_name(file_name));
        Self {
            path: dir.join(name),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the scratch directory if needed and write `bytes` to the file.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        debug!("Stored upload at {}", self.path.display());
        Ok(())
    }

    /// Remove the file. A file that was never written or is already gone is not an error.
    ///
    /// If this future is dropped before it finishes, the guard's `Drop`
    /// still removes the file.
    pub async fn release(mut self) -> io::Result<()> {
        let result = match tokio::fs::symlink_metadata(&self.path).await {
            Err(_) => Ok(()),
            Ok(_) => tokio::fs::remove_file(&self.path).await,
        };
        self.released = true;
        if result.is_ok() {
            debug!("Removed transient file {}", self.path.display());
        }
        result
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = remove_if_exists(&self.path) {
                warn!("Failed to remove transient file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Synchronous removal for the `Drop` fallback.
fn remove_if_exists(path: &Path) -> io::Result<()> {
    if std::fs::symlink_metadata(path).is_err() {
        return Ok(());
    }
    std::fs::remove_file(path)?;
    debug!("Removed transient file {}", path.display());
    Ok(())
}
