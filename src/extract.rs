//! Single-image extraction
//!
//! The chain every entry point shares: preprocess, search the four
//! orientations, select the target line. Also writes the per-image
//! artifacts (result JSON, preprocessed image, annotated image).

use crate::config::Config;
use crate::engine::{OcrEngine, TextRegion};
use crate::error::OcrError;
use crate::loader;
use crate::preprocessing::Pipeline;
use crate::rotation::{self, RotationOutcome, ScoreStrategy};
use crate::selector::SelectionStrategy;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const HIGHLIGHT_THICKNESS: i32 = 3;

/// Contents of `ocr_result_<basename>.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleImageResult {
    pub target_line: Option<String>,
    pub raw_text: String,
}

/// Everything the chain produced for one image
#[derive(Debug, Clone)]
pub struct Extraction {
    pub target_line: Option<String>,
    pub raw_text: String,
    /// Corrective deskew rotation, degrees
    pub skew_angle: f32,
    pub rotation: RotationOutcome,
    pub preprocessed: GrayImage,
    pub processing_time_ms: u64,
}

impl Extraction {
    pub fn rotation_used(&self) -> u16 {
        self.rotation.angle
    }

    /// Average confidence of the chosen orientation's output, whatever the
    /// rotation score strategy was
    pub fn avg_confidence(&self) -> f32 {
        self.rotation.output.average_confidence()
    }

    /// Recognized tokens that could belong to the ID line
    pub fn highlights(&self) -> Vec<&TextRegion> {
        self.rotation
            .output
            .regions
            .iter()
            .filter(|region| is_highlight(&region.text))
            .collect()
    }

    pub fn result(&self) -> SingleImageResult {
        SingleImageResult {
            target_line: self.target_line.clone(),
            raw_text: self.raw_text.clone(),
        }
    }

    /// The recognized orientation in color with every highlight boxed in red
    pub fn annotate(&self) -> RgbImage {
        let mut canvas = self.rotation.image.to_rgb8();

        for region in self.highlights() {
            let bbox = region.bounding_box;
            // Grow outwards one pixel at a time for the line thickness
            for inset in 0..HIGHLIGHT_THICKNESS {
                let rect = Rect::at(bbox.left as i32 - inset, bbox.top as i32 - inset).of_size(
                    bbox.width.max(1) + 2 * inset as u32,
                    bbox.height.max(1) + 2 * inset as u32,
                );
                draw_hollow_rect_mut(&mut canvas, rect, HIGHLIGHT_COLOR);
            }
        }

        canvas
    }

    /// Write the result JSON, the preprocessed image and the annotated image
    /// into `dir`, named after `basename`
    pub fn save_artifacts(&self, dir: &Path, basename: &str) -> Result<Artifacts, OcrError> {
        fs::create_dir_all(dir)?;

        let artifacts = Artifacts {
            result: write_result(dir, basename, &self.result())?,
            preprocessed: dir.join(format!("preprocessed_{}.png", basename)),
            annotated: dir.join(format!("annotated_{}.png", basename)),
        };

        self.preprocessed
            .save(&artifacts.preprocessed)
            .map_err(|e| image_write_error(&artifacts.preprocessed, e))?;
        self.annotate()
            .save(&artifacts.annotated)
            .map_err(|e| image_write_error(&artifacts.annotated, e))?;

        Ok(artifacts)
    }
}

/// Paths written by [`Extraction::save_artifacts`]
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub result: PathBuf,
    pub preprocessed: PathBuf,
    pub annotated: PathBuf,
}

/// Runs the extraction chain with one engine and one configuration
pub struct Extractor {
    engine: Arc<dyn OcrEngine>,
    pipeline: Pipeline,
    selector: SelectionStrategy,
    score: ScoreStrategy,
}

impl Extractor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &Config) -> Result<Self, OcrError> {
        Ok(Self {
            engine,
            pipeline: Pipeline::new(config.preprocess.clone())?,
            selector: config.selector,
            score: config.score,
        })
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn selector(&self) -> SelectionStrategy {
        self.selector
    }

    /// Preprocess, find the best orientation and select the target line
    pub fn run(&self, image: &DynamicImage) -> Result<Extraction, OcrError> {
        let start = Instant::now();

        let preprocessed = self.pipeline.process(image)?;
        let input = DynamicImage::ImageLuma8(preprocessed.image.clone());
        let rotation = rotation::best_rotation(self.engine.as_ref(), &input, self.score);

        let raw_text = rotation.output.text.clone();
        let target_line = self.selector.select_from_text(&raw_text);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Extraction took {}ms (rotation {}, score {:.2}, target {:?})",
            processing_time_ms,
            rotation.angle,
            rotation.score,
            target_line
        );

        Ok(Extraction {
            target_line,
            raw_text,
            skew_angle: preprocessed.skew_angle,
            rotation,
            preprocessed: preprocessed.image,
            processing_time_ms,
        })
    }

    /// Load an image file and run the chain on it
    pub fn process_file(&self, path: &Path) -> Result<Extraction, OcrError> {
        let image = loader::load_image(path)?;
        self.run(&image)
    }
}

/// Tokens containing a `1` or an `_` are drawn and reported as highlights
pub fn is_highlight(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && (text.contains('1') || text.contains('_'))
}

/// Write `ocr_result_<basename>.json` into `dir`
pub fn write_result(
    dir: &Path,
    basename: &str,
    result: &SingleImageResult,
) -> Result<PathBuf, OcrError> {
    let path = dir.join(format!("ocr_result_{}.json", basename));
    write_json(&path, result)?;
    Ok(path)
}

/// Pretty-print `value` as JSON into `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OcrError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn image_write_error(path: &Path, e: image::ImageError) -> OcrError {
    OcrError::Io(std::io::Error::other(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoundingBox, OcrOutput};
    use crate::preprocessing::Preset;
    use image::{GenericImageView, Luma};

    /// Always reads the same words, regardless of the image
    struct ScriptedEngine;

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn description(&self) -> &'static str {
            "test engine"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<OcrOutput, OcrError> {
            let word = |text: &str, left: u32, confidence: f32| TextRegion {
                text: text.to_string(),
                bounding_box: BoundingBox {
                    left,
                    top: 10,
                    width: 20,
                    height: 10,
                },
                confidence,
            };
            Ok(OcrOutput::new(
                "WAYBILL\n163233702292313922_1_",
                vec![word("WAYBILL", 5, 80.0), word("163233702292313922_1_", 40, 90.0)],
            ))
        }
    }

    fn extractor() -> Extractor {
        let config = Config {
            preprocess: Preset::Smooth.config(),
            ..Config::default()
        };
        Extractor::new(Arc::new(ScriptedEngine), &config).unwrap()
    }

    fn photo() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(160, 80, Luma([220])))
    }

    #[test]
    fn test_run_selects_target_line() {
        let extraction = extractor().run(&photo()).unwrap();

        assert_eq!(
            extraction.target_line.as_deref(),
            Some("163233702292313922_1_")
        );
        assert_eq!(extraction.rotation_used(), 0);
        assert_eq!(extraction.avg_confidence(), 85.0);
        assert_eq!(extraction.preprocessed.dimensions(), (1600, 800));
        assert_eq!(extraction.highlights().len(), 1);
    }

    #[test]
    fn test_highlight_tokens() {
        assert!(is_highlight("12"));
        assert!(is_highlight("AB_"));
        assert!(!is_highlight("WAYBILL"));
        assert!(!is_highlight("  "));
    }

    #[test]
    fn test_annotation_boxes_highlights_in_red() {
        let extraction = extractor().run(&photo()).unwrap();
        let annotated = extraction.annotate();

        // Outer edge of the three pixel border around the ID token
        assert_eq!(*annotated.get_pixel(38, 8), HIGHLIGHT_COLOR);
        assert_eq!(*annotated.get_pixel(40, 10), HIGHLIGHT_COLOR);
        // Inside the box is untouched
        assert_ne!(*annotated.get_pixel(50, 15), HIGHLIGHT_COLOR);
        // The WAYBILL token is not boxed
        assert_ne!(*annotated.get_pixel(5, 10), HIGHLIGHT_COLOR);
    }

    #[test]
    fn test_save_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let extraction = extractor().run(&photo()).unwrap();

        let artifacts = extraction.save_artifacts(dir.path(), "scan").unwrap();

        assert!(artifacts.result.ends_with("ocr_result_scan.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifacts.result).unwrap()).unwrap();
        assert_eq!(json["target_line"], "163233702292313922_1_");
        assert_eq!(json["raw_text"], "WAYBILL\n163233702292313922_1_");

        let preprocessed = image::open(&artifacts.preprocessed).unwrap();
        assert_eq!(preprocessed.dimensions(), (1600, 800));
        assert!(artifacts.annotated.exists());
    }

    #[test]
    fn test_missing_file_fails() {
        let result = extractor().process_file(Path::new("/nope/missing.jpg"));
        assert!(matches!(result, Err(OcrError::LoadError(_))));
    }
}
