use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::pipeline::ExtractionError;

/// Receipt bytes written to a temporary file for the duration of one scan.
///
/// The file is removed when the value is dropped, whichever way the scan
/// ends. A failed removal is logged and never replaces the scan's result.
pub struct StagedUpload {
    path: Option<TempPath>,
    mime_type: String,
}

impl StagedUpload {
    /// Write `bytes` to a fresh file under `dir` (created if missing).
    /// The stored MIME type is the lowercased essence of `mime_type`.
    pub fn stage(dir: &Path, bytes: &[u8], mime_type: &str) -> Result<Self, ExtractionError> {
        if !is_supported_mime(mime_type) {
            return Err(ExtractionError::UnsupportedMedia(mime_type.to_string()));
        }
        let essence = mime_essence(mime_type);
        let mime_type = essence.as_str();
        if bytes.is_empty() {
            return Err(ExtractionError::FileAccess("uploaded file is empty".into()));
        }

        std::fs::create_dir_all(dir).map_err(|e| {
            ExtractionError::FileAccess(format!("cannot create {}: {e}", dir.display()))
        })?;

        let suffix = format!(".{}", extension_for(mime_type));
        let mut file = tempfile::Builder::new()
            .prefix("receipt-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| ExtractionError::FileAccess(e.to_string()))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| ExtractionError::FileAccess(e.to_string()))?;

        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), size = bytes.len(), mime_type, "Upload staged");

        Ok(Self {
            path: Some(path),
            mime_type: mime_type.to_string(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn read(&self) -> Result<Vec<u8>, ExtractionError> {
        let path = self
            .path()
            .ok_or_else(|| ExtractionError::FileAccess("staged file already released".into()))?;
        std::fs::read(path).map_err(|e| {
            ExtractionError::FileAccess(format!("cannot read {}: {e}", path.display()))
        })
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let staged: PathBuf = path.to_path_buf();
            match path.close() {
                Ok(()) => tracing::debug!(path = %staged.display(), "Staged upload removed"),
                Err(e) => tracing::warn!(
                    path = %staged.display(),
                    error = %e,
                    "Failed to remove staged upload"
                ),
            }
        }
    }
}

/// Remove staged receipts left behind by a previous run that crashed
/// mid-scan. Returns how many files were removed.
pub fn cleanup_orphaned_uploads(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return 0, // Upload dir may not exist yet
    };

    let mut cleaned = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_staged = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("receipt-"));
        if !is_staged {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => cleaned += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not remove orphaned upload"),
        }
    }

    if cleaned > 0 {
        tracing::info!(files_cleaned = cleaned, "Cleaned orphaned uploads from previous run");
    }
    cleaned
}

/// Images of any kind, and PDF.
pub fn is_supported_mime(mime_type: &str) -> bool {
    let essence = mime_essence(mime_type);
    essence.starts_with("image/") || essence == "application/pdf"
}

/// `"IMAGE/JPEG; q=1"` → `"image/jpeg"`.
pub fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "application/pdf" => "pdf",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    }
}
