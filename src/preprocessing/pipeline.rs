use crate::error::OcrError;
use clap::ValueEnum;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;
use super::steps::denoise::DenoiseStrategy;
use super::steps::resize::{ResizePolicy, DEFAULT_TARGET_MAX_DIM};
use super::steps::threshold::{ThresholdMethod, ThresholdParams};

/// Preprocessing preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Median denoise, threshold 25/12, closing and deskew
    #[default]
    Standard,
    /// Bilateral denoise, threshold 31/2, no closing or deskew
    Smooth,
    /// Bilateral denoise, sharpen, threshold 31/5
    Sharpen,
}

impl Preset {
    /// Get the preset name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Smooth => "smooth",
            Self::Sharpen => "sharpen",
        }
    }

    pub fn config(&self) -> PreprocessConfig {
        let base = PreprocessConfig {
            target_max_dim: DEFAULT_TARGET_MAX_DIM,
            resize_policy: ResizePolicy::Normalize,
            denoise: DenoiseStrategy::Median,
            sharpen: false,
            threshold: ThresholdParams {
                method: ThresholdMethod::Gaussian,
                block_size: 25,
                offset: 12.0,
            },
            close: true,
            deskew: true,
        };

        match self {
            Self::Standard => base,
            Self::Smooth => PreprocessConfig {
                denoise: DenoiseStrategy::Bilateral,
                threshold: ThresholdParams {
                    block_size: 31,
                    offset: 2.0,
                    ..base.threshold
                },
                close: false,
                deskew: false,
                ..base
            },
            Self::Sharpen => PreprocessConfig {
                denoise: DenoiseStrategy::Bilateral,
                sharpen: true,
                threshold: ThresholdParams {
                    block_size: 31,
                    offset: 5.0,
                    ..base.threshold
                },
                close: false,
                deskew: false,
                ..base
            },
        }
    }
}

/// Settings for every preprocessing step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessConfig {
    pub target_max_dim: u32,
    pub resize_policy: ResizePolicy,
    pub denoise: DenoiseStrategy,
    pub sharpen: bool,
    pub threshold: ThresholdParams,
    /// Morphological closing after thresholding
    pub close: bool,
    pub deskew: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Preset::default().config()
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Corrective rotation applied by deskew, in degrees
    pub skew_angle: f32,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline that applies the configured steps in fixed order
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PreprocessConfig,
}

impl Pipeline {
    pub fn new(config: PreprocessConfig) -> Result<Self, OcrError> {
        config.threshold.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Process an image: grayscale, resize, denoise, sharpen, threshold,
    /// close, deskew
    pub fn process(&self, image: &DynamicImage) -> Result<PreprocessingResult, OcrError> {
        let start = Instant::now();
        let mut timings = Vec::new();
        let config = &self.config;

        let mut img = run_step("grayscale", &mut timings, || {
            Ok(steps::grayscale::apply(image))
        })?;

        img = run_step("resize", &mut timings, || {
            Ok(steps::resize::apply(img, config.resize_policy, config.target_max_dim))
        })?;

        if config.denoise != DenoiseStrategy::None {
            img = run_step("denoise", &mut timings, || {
                Ok(steps::denoise::apply(img, config.denoise))
            })?;
        }

        if config.sharpen {
            img = run_step("sharpen", &mut timings, || Ok(steps::sharpen::apply(&img)))?;
        }

        img = run_step("threshold", &mut timings, || {
            steps::threshold::apply(&img, &config.threshold)
        })?;

        if config.close {
            img = run_step("close", &mut timings, || Ok(steps::morphology::close(&img)))?;
        }

        let mut skew_angle = 0.0;
        if config.deskew {
            let (deskewed, angle) =
                run_step("deskew", &mut timings, || Ok(steps::deskew::apply(img)))?;
            img = deskewed;
            skew_angle = angle;
        }

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Preprocessed to {}x{} in {}ms (skew {:.2} deg)",
            img.width(),
            img.height(),
            total_time_ms,
            skew_angle
        );

        Ok(PreprocessingResult {
            image: img,
            skew_angle,
            total_time_ms,
            steps: timings,
        })
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> Result<T, OcrError>
where
    F: FnOnce() -> Result<T, OcrError>,
{
    let step_start = Instant::now();
    let result = step_fn()?;
    let time_ms = step_start.elapsed().as_millis() as u64;
    tracing::debug!("Preprocessing step {} took {}ms", name, time_ms);
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    Ok(result)
}
