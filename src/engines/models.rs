//! Model and trained-data cache shared by the engines
//!
//! Files are downloaded once into the user cache directory and reused by
//! every later run.

use crate::error::OcrError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Root of the download cache
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("waybill-ocr")
}

/// Return the cached copy of `url` under `relative`, downloading it first if
/// it is not there yet
pub fn ensure_cached(url: &str, relative: &Path) -> Result<PathBuf, OcrError> {
    let path = cache_dir().join(relative);

    if path.exists() {
        tracing::info!("Using cached {:?}", path);
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            OcrError::InitializationError(format!("Failed to create cache directory: {}", e))
        })?;
    }

    tracing::info!("Downloading {} (this may take a moment)...", url);
    download_file(url, &path)?;
    tracing::info!("Downloaded {:?}", path);

    Ok(path)
}

/// Download a file from URL to path using ureq.
/// The body lands in a temporary file beside `path` first so an interrupted
/// download never looks cached
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut partial = NamedTempFile::new_in(dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create temp file in {:?}: {}", dir, e))
    })?;
    partial.write_all(&buffer).map_err(|e| {
        OcrError::InitializationError(format!("Failed to write {:?}: {}", partial.path(), e))
    })?;

    partial.persist(path).map_err(|e| {
        OcrError::InitializationError(format!("Failed to move download to {:?}: {}", path, e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir_is_namespaced() {
        assert!(cache_dir().ends_with("waybill-ocr"));
    }
}
