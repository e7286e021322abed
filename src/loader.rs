use crate::error::OcrError;
use image::DynamicImage;
use std::path::Path;

/// Extensions accepted as waybill samples (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Load an image file into memory; fails if it is missing or undecodable
pub fn load_image(path: &Path) -> Result<DynamicImage, OcrError> {
    image::open(path)
        .map_err(|e| OcrError::LoadError(format!("{}: {}", path.display(), e)))
}

/// Decode an in-memory image (e.g. an upload)
pub fn load_image_from_memory(data: &[u8]) -> Result<DynamicImage, OcrError> {
    image::load_from_memory(data).map_err(|e| OcrError::LoadError(e.to_string()))
}

/// Whether the path has one of the supported image extensions
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}
