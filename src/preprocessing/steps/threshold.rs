use crate::error::OcrError;
use clap::ValueEnum;
use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use serde::Serialize;

/// How the local threshold around each pixel is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdMethod {
    /// Gaussian-weighted neighbourhood mean
    #[default]
    Gaussian,
    /// Plain box mean over the block
    Mean,
}

/// Adaptive threshold parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdParams {
    pub method: ThresholdMethod,
    /// Side of the square neighbourhood, odd and at least 3
    pub block_size: u32,
    /// Subtracted from the local mean before comparing
    pub offset: f32,
}

impl ThresholdParams {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(OcrError::PreprocessingError(format!(
                "threshold block size must be odd and >= 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// Apply adaptive thresholding
/// Pixels brighter than `local_mean - offset` become white, the rest black
pub fn apply(image: &GrayImage, params: &ThresholdParams) -> Result<GrayImage, OcrError> {
    params.validate()?;

    let binarized = match params.method {
        ThresholdMethod::Gaussian => gaussian_threshold(image, params.block_size, params.offset),
        ThresholdMethod::Mean => mean_threshold(image, params.block_size, params.offset),
    };

    Ok(binarized)
}

fn gaussian_threshold(img: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    // Same sigma rule OpenCV derives from the kernel size
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(img, sigma);

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y).0[0] as f32;
        let mean = local_mean.get_pixel(x, y).0[0] as f32;
        binarize(pixel, mean - offset)
    })
}

fn mean_threshold(img: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let half = block_size / 2;
    let integral: Image<Luma<u64>> = integral_image(img);

    GrayImage::from_fn(width, height, |x, y| {
        // Window clipped to the image, inclusive on both ends
        let left = x.saturating_sub(half);
        let top = y.saturating_sub(half);
        let right = (x + half).min(width - 1);
        let bottom = (y + half).min(height - 1);

        let area = ((right - left + 1) * (bottom - top + 1)) as f32;
        let mean = sum_image_pixels(&integral, left, top, right, bottom)[0] as f32 / area;
        let pixel = img.get_pixel(x, y).0[0] as f32;
        binarize(pixel, mean - offset)
    })
}

fn binarize(pixel: f32, threshold: f32) -> Luma<u8> {
    if pixel > threshold {
        Luma([255u8])
    } else {
        Luma([0u8])
    }
}
