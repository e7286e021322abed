//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Detects words, groups them into lines and recognizes each line. Downloads
//! its neural network models automatically on first use.

use super::models::ensure_cached;
use crate::config::Config;
use crate::engine::{BoundingBox, OcrEngine, OcrOutput, TextRegion};
use crate::error::OcrError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use std::path::Path;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Load the detection and recognition models, downloading them if needed
    pub fn new(_config: &Config) -> Result<Self, OcrError> {
        let detection_model_path =
            ensure_cached(DETECTION_MODEL_URL, Path::new("text-detection.rten"))?;
        let recognition_model_path =
            ensure_cached(RECOGNITION_MODEL_URL, Path::new("text-recognition.rten"))?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - line detection and grouping, no system dependencies"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        // HWC RGB bytes, which is what ImageSource::from_bytes expects
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            OcrError::Recognition(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::Recognition(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::Recognition(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::Recognition(format!("Failed to recognize text: {}", e)))?;

        let mut lines = Vec::new();
        let mut regions = Vec::new();

        for line in line_texts.iter().flatten() {
            let text = line
                .words()
                .map(|word| word.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            if text.trim().is_empty() {
                continue;
            }

            // ocrs has no per-word scores; every word shares its line's estimate
            let confidence = line_confidence(&text);
            for word in line.words() {
                let rect = word.bounding_rect();
                regions.push(TextRegion {
                    text: word.to_string(),
                    bounding_box: BoundingBox {
                        left: rect.left().max(0) as u32,
                        top: rect.top().max(0) as u32,
                        width: rect.width().max(0) as u32,
                        height: rect.height().max(0) as u32,
                    },
                    confidence,
                });
            }
            lines.push(text);
        }

        Ok(OcrOutput::new(lines.join("\n"), regions))
    }
}

// ============================================================================
// Confidence estimate
// ============================================================================

/// Estimate a 0-100 confidence for one recognized line from its text alone.
///
/// Waybill text is digit-heavy with `_` separators, so digits and
/// underscores count as regular content; stray symbols, fragmented words,
/// long runs of one character and odd spacing pull the estimate down.
fn line_confidence(text: &str) -> f32 {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }
    if chars.len() < 3 {
        // Too short to judge
        return 50.0;
    }

    let score = 0.6 * content_score(&chars)
        + 0.2 * fragment_score(text)
        + 0.1 * spacing_score(&chars)
        + 0.1 * run_score(&chars);

    (score * 100.0).clamp(0.0, 100.0)
}

/// Share of characters that look like real content
fn content_score(chars: &[char]) -> f32 {
    let total = chars.len() as f32;
    let content = chars
        .iter()
        .filter(|c| c.is_alphanumeric() || **c == '_')
        .count() as f32;
    let junk = chars
        .iter()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation())
        .count() as f32;

    let junk_penalty = 1.0 - (junk / total * 10.0).min(1.0);
    let content_ratio = (content / total * 1.25).min(1.0);

    junk_penalty * 0.6 + content_ratio * 0.4
}

/// Garbled lines break into many one-character tokens
fn fragment_score(text: &str) -> f32 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }

    let single = tokens.iter().filter(|t| t.chars().count() == 1).count() as f32;
    1.0 - (single / tokens.len() as f32).min(1.0) * 0.7
}

/// Penalize lines that are mostly whitespace
fn spacing_score(chars: &[char]) -> f32 {
    let whitespace = chars.iter().filter(|c| c.is_whitespace()).count() as f32;
    match (whitespace / chars.len() as f32 * 100.0) as usize {
        0..=30 => 1.0,
        31..=50 => 0.6,
        _ => 0.2,
    }
}

/// Long runs of the same non-digit character usually mean confusion;
/// digit runs are normal in IDs
fn run_score(chars: &[char]) -> f32 {
    let mut longest = 1;
    let mut current = 1;

    for pair in chars.windows(2) {
        if pair[0] == pair[1] && !pair[0].is_whitespace() && !pair[0].is_ascii_digit() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }

    match longest {
        1..=3 => 1.0,
        4..=5 => 0.7,
        _ => 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_scores_zero() {
        assert_eq!(line_confidence(""), 0.0);
    }

    #[test]
    fn test_tiny_line_is_undecided() {
        assert_eq!(line_confidence("Hi"), 50.0);
    }

    #[test]
    fn test_waybill_id_scores_high() {
        let confidence = line_confidence("163233702292313922_1_");
        assert!(confidence > 90.0, "Expected > 90, got {}", confidence);
    }

    #[test]
    fn test_symbol_soup_scores_low() {
        let confidence = line_confidence("§±®©¥€£¢¤");
        assert!(confidence < 50.0, "Expected < 50, got {}", confidence);
    }

    #[test]
    fn test_fragments_lower_confidence() {
        let clean = line_confidence("Consignee Name Address");
        let fragmented = line_confidence("a b c d e f g h");
        assert!(fragmented < clean, "{} should be < {}", fragmented, clean);
    }

    #[test]
    fn test_runs_of_letters_lower_confidence_but_digits_do_not() {
        assert!(run_score(&"Heeeeeeello".chars().collect::<Vec<_>>()) < 1.0);
        assert_eq!(run_score(&"1000000_1_".chars().collect::<Vec<_>>()), 1.0);
    }
}
