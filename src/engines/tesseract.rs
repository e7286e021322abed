//! Tesseract engine implementation
//!
//! Word-level recognizer with real per-word confidences and bounding boxes.
//! Uses the tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use unless a
//! tessdata directory is configured.

use super::models::{cache_dir, ensure_cached};
use super::tsv;
use crate::config::Config;
use crate::engine::{OcrEngine, OcrOutput};
use crate::error::OcrError;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Mutex;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
pub struct TesseractEngine {
    /// Directory holding `<language>.traineddata`
    tessdata_path: String,
    language: String,
    /// Loaded handle, checked out for the length of one recognition
    handle: Mutex<Option<Tesseract>>,
}

impl TesseractEngine {
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let language = config.language.clone();
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => cached_tessdata(&language)?,
        };

        // Fail at startup rather than on the first image
        let tess = Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "tesseract engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
            handle: Mutex::new(Some(tess)),
        })
    }

    fn load(&self) -> Result<Tesseract, OcrError> {
        tracing::debug!("Reloading Tesseract trained data");
        Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| OcrError::Recognition(format!("Failed to create Tesseract: {}", e)))
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR - per-word confidences, better for noisy phone photos"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        // BMP is always understood by leptonica
        let rgb_img = image.to_rgb8();
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::Recognition(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Tesseract input {}x{}, {} bytes",
            rgb_img.width(),
            rgb_img.height(),
            bmp_data.len()
        );

        let (text, tsv_text, mean_conf) = with_handle(
            &self.handle,
            || self.load(),
            |tess| {
                let mut tess = tess
                    .set_image_from_mem(&bmp_data)
                    .map_err(|e| OcrError::Recognition(format!("Failed to set image: {}", e)))?
                    .recognize()
                    .map_err(|e| {
                        OcrError::Recognition(format!("Failed to recognize text: {}", e))
                    })?;

                // Reading results leaves the handle usable, so it goes back either way
                let text = tess.get_text();
                let tsv_text = tess.get_tsv_text(0);
                let mean_conf = tess.mean_text_conf();
                Ok((tess, (text, tsv_text, mean_conf)))
            },
        )?;

        let text =
            text.map_err(|e| OcrError::Recognition(format!("Failed to get text: {}", e)))?;
        let tsv_text = tsv_text
            .map_err(|e| OcrError::Recognition(format!("Failed to get word data: {}", e)))?;

        let regions = tsv::parse_words(&tsv_text);
        tracing::debug!(
            "Tesseract found {} words (mean confidence {})",
            regions.len(),
            mean_conf
        );

        Ok(OcrOutput::new(text.trim(), regions))
    }
}

/// Run `f` with the handle from `slot`, loading a fresh one when the slot is
/// empty. `f` hands the handle back on success; when it fails the handle was
/// consumed and the next call loads a new one.
fn with_handle<H, R>(
    slot: &Mutex<Option<H>>,
    load: impl FnOnce() -> Result<H, OcrError>,
    f: impl FnOnce(H) -> Result<(H, R), OcrError>,
) -> Result<R, OcrError> {
    let mut slot = slot
        .lock()
        .map_err(|_| OcrError::Internal("Tesseract handle lock poisoned".to_string()))?;

    let handle = match slot.take() {
        Some(handle) => handle,
        None => load()?,
    };
    let (handle, result) = f(handle)?;
    *slot = Some(handle);

    Ok(result)
}

/// Directory of the cached trained data for `language`, downloading it if needed
fn cached_tessdata(language: &str) -> Result<String, OcrError> {
    let relative = PathBuf::from("tessdata").join(format!("{}.traineddata", language));
    ensure_cached(&tessdata_url(language), &relative)?;

    // Tesseract expects the directory, not the file
    cache_dir()
        .join("tessdata")
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}

/// tessdata_fast keeps downloads small
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
