//! Rotation search
//!
//! Waybills are photographed in any orientation. Each quarter turn is
//! recognized and the orientation with the best score wins.

use crate::engine::{OcrEngine, OcrOutput};
use clap::ValueEnum;
use image::DynamicImage;
use serde::Serialize;

/// Orientations tried, in order; counter-clockwise degrees
pub const ROTATION_ANGLES: [u16; 4] = [0, 90, 180, 270];

/// Score of a rotation whose recognition failed or found no text
pub const FAILED_SCORE: f32 = -1.0;

/// How a recognition attempt is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreStrategy {
    /// Average per-region confidence
    #[default]
    Confidence,
    /// Total number of recognized characters
    Length,
}

impl ScoreStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confidence => "confidence",
            Self::Length => "length",
        }
    }

    pub fn score(&self, output: &OcrOutput) -> f32 {
        if output.is_empty() {
            return FAILED_SCORE;
        }
        match self {
            Self::Confidence => output.average_confidence(),
            Self::Length => output.text_length() as f32,
        }
    }
}

/// One tried orientation and its recognition result
#[derive(Debug, Clone)]
pub struct RotationCandidate {
    pub angle: u16,
    pub output: OcrOutput,
    pub score: f32,
}

/// The winning orientation
#[derive(Debug, Clone)]
pub struct RotationOutcome {
    pub angle: u16,
    /// The image as recognized, i.e. rotated by `angle`
    pub image: DynamicImage,
    pub output: OcrOutput,
    /// Score of the winner; 0 when no orientation produced text
    pub score: f32,
}

/// Rotate counter-clockwise by a quarter-turn multiple, growing the canvas
/// as needed so nothing is cropped
pub fn rotate(image: &DynamicImage, angle: u16) -> DynamicImage {
    match angle % 360 {
        90 => image.rotate270(),
        180 => image.rotate180(),
        270 => image.rotate90(),
        _ => image.clone(),
    }
}

/// Recognize one orientation; failures and empty results score the minimum
pub fn try_rotation(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    angle: u16,
    strategy: ScoreStrategy,
) -> RotationCandidate {
    let output = match engine.recognize(image) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("OCR failed at {} degrees: {}", angle, e);
            OcrOutput::default()
        }
    };

    let score = strategy.score(&output);
    tracing::debug!(
        "Rotation {} deg: score {:.2}, {} chars",
        angle,
        score,
        output.text_length()
    );

    RotationCandidate {
        angle,
        output,
        score,
    }
}

/// Try every orientation and keep the best-scoring one.
/// The first strictly greater score wins, so ties keep the earlier angle.
pub fn best_rotation(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    strategy: ScoreStrategy,
) -> RotationOutcome {
    let mut best: Option<(RotationCandidate, DynamicImage)> = None;

    for angle in ROTATION_ANGLES {
        let rotated = rotate(image, angle);
        let candidate = try_rotation(engine, &rotated, angle, strategy);

        let better = match &best {
            Some((current, _)) => candidate.score > current.score,
            None => true,
        };
        if better {
            best = Some((candidate, rotated));
        }
    }

    match best {
        Some((candidate, rotated)) if candidate.score > FAILED_SCORE => RotationOutcome {
            angle: candidate.angle,
            image: rotated,
            output: candidate.output,
            score: candidate.score,
        },
        _ => {
            tracing::warn!("No orientation produced any text");
            RotationOutcome {
                angle: ROTATION_ANGLES[0],
                image: image.clone(),
                output: OcrOutput::default(),
                score: 0.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoundingBox, TextRegion};
    use crate::error::OcrError;
    use image::{GenericImageView, GrayImage, Luma};
    use std::sync::Mutex;

    /// Recognizes text only when the marker pixel sits in the bottom-right
    /// corner, and records the sizes it was shown
    struct CornerEngine {
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl OcrEngine for CornerEngine {
        fn name(&self) -> &'static str {
            "corner"
        }

        fn description(&self) -> &'static str {
            "test engine"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
            let (w, h) = image.dimensions();
            self.seen.lock().unwrap().push((w, h));
            if image.get_pixel(w - 1, h - 1).0[0] == 0 {
                Ok(output("12345_1_", 90.0))
            } else {
                Ok(output("noise", 10.0))
            }
        }
    }

    /// Same confidence for everything
    struct FlatEngine;

    impl OcrEngine for FlatEngine {
        fn name(&self) -> &'static str {
            "flat"
        }

        fn description(&self) -> &'static str {
            "test engine"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
            // Taller images read more text but with the same confidence
            let text = if image.height() > image.width() {
                "abc\ndefgh"
            } else {
                "abc"
            };
            Ok(output(text, 50.0))
        }
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn description(&self) -> &'static str {
            "test engine"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<OcrOutput, OcrError> {
            Err(OcrError::Recognition("engine exploded".to_string()))
        }
    }

    /// Fails on landscape input, reads the ID on portrait input
    struct LandscapeFailingEngine {
        calls: Mutex<Vec<u32>>,
    }

    impl OcrEngine for LandscapeFailingEngine {
        fn name(&self) -> &'static str {
            "landscape-failing"
        }

        fn description(&self) -> &'static str {
            "test engine"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
            self.calls.lock().unwrap().push(image.width());
            if image.width() > image.height() {
                Err(OcrError::Recognition("cannot read landscape".to_string()))
            } else {
                Ok(output("x_1_", 70.0))
            }
        }
    }

    fn output(text: &str, confidence: f32) -> OcrOutput {
        let regions = text
            .split_whitespace()
            .map(|word| TextRegion {
                text: word.to_string(),
                bounding_box: BoundingBox {
                    left: 0,
                    top: 0,
                    width: 1,
                    height: 1,
                },
                confidence,
            })
            .collect();
        OcrOutput::new(text, regions)
    }

    fn marked_image() -> DynamicImage {
        // 40x20 with the marker in the top-left corner
        let mut img = GrayImage::from_pixel(40, 20, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_rotate_expands_canvas() {
        let img = marked_image();
        assert_eq!(rotate(&img, 0).dimensions(), (40, 20));
        assert_eq!(rotate(&img, 90).dimensions(), (20, 40));
        assert_eq!(rotate(&img, 180).dimensions(), (40, 20));
        assert_eq!(rotate(&img, 270).dimensions(), (20, 40));
    }

    #[test]
    fn test_rotate_is_counter_clockwise() {
        // Top-left goes to bottom-left after a quarter turn counter-clockwise
        let rotated = rotate(&marked_image(), 90);
        assert_eq!(rotated.get_pixel(0, 39).0[0], 0);
        let rotated = rotate(&marked_image(), 270);
        assert_eq!(rotated.get_pixel(19, 0).0[0], 0);
    }

    #[test]
    fn test_best_rotation_finds_upright_orientation() {
        let engine = CornerEngine {
            seen: Mutex::new(Vec::new()),
        };

        let outcome = best_rotation(&engine, &marked_image(), ScoreStrategy::Confidence);

        assert_eq!(outcome.angle, 180);
        assert_eq!(outcome.output.text, "12345_1_");
        assert_eq!(outcome.score, 90.0);
        assert_eq!(outcome.image.dimensions(), (40, 20));
        assert_eq!(
            *engine.seen.lock().unwrap(),
            vec![(40, 20), (20, 40), (40, 20), (20, 40)]
        );
    }

    #[test]
    fn test_ties_keep_earliest_angle() {
        let outcome = best_rotation(&FlatEngine, &marked_image(), ScoreStrategy::Confidence);
        assert_eq!(outcome.angle, 0);
        assert_eq!(outcome.score, 50.0);
    }

    #[test]
    fn test_length_strategy_prefers_more_text() {
        let outcome = best_rotation(&FlatEngine, &marked_image(), ScoreStrategy::Length);
        assert_eq!(outcome.angle, 90);
        assert_eq!(outcome.score, 8.0);
    }

    #[test]
    fn test_winner_scores_at_least_every_candidate() {
        let engine = CornerEngine {
            seen: Mutex::new(Vec::new()),
        };
        let image = marked_image();
        let outcome = best_rotation(&engine, &image, ScoreStrategy::Confidence);

        for angle in ROTATION_ANGLES {
            let candidate =
                try_rotation(&engine, &rotate(&image, angle), angle, ScoreStrategy::Confidence);
            assert!(outcome.score >= candidate.score);
        }
        assert!(ROTATION_ANGLES.contains(&outcome.angle));
    }

    #[test]
    fn test_all_failures_give_neutral_result() {
        let outcome = best_rotation(&FailingEngine, &marked_image(), ScoreStrategy::Confidence);
        assert_eq!(outcome.angle, 0);
        assert!(outcome.output.text.is_empty());
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn test_failed_angle_does_not_stop_search() {
        for (strategy, expected_score) in [
            (ScoreStrategy::Confidence, 70.0),
            (ScoreStrategy::Length, 4.0),
        ] {
            let engine = LandscapeFailingEngine {
                calls: Mutex::new(Vec::new()),
            };
            let outcome = best_rotation(&engine, &marked_image(), strategy);

            assert_eq!(outcome.angle, 90, "{:?}", strategy);
            assert_eq!(outcome.output.text, "x_1_");
            assert_eq!(outcome.score, expected_score);
            assert_eq!(outcome.image.dimensions(), (20, 40));
            // All four orientations were tried despite the failure at 0
            assert_eq!(*engine.calls.lock().unwrap(), vec![40, 20, 40, 20]);
        }
    }

    #[test]
    fn test_empty_text_scores_minimum() {
        assert_eq!(
            ScoreStrategy::Confidence.score(&OcrOutput::from_text("  \n")),
            FAILED_SCORE
        );
        assert_eq!(
            ScoreStrategy::Length.score(&OcrOutput::default()),
            FAILED_SCORE
        );
    }
}
