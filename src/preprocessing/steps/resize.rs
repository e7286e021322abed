use clap::ValueEnum;
use image::{imageops, imageops::FilterType, GrayImage};
use serde::Serialize;

/// Target size of the larger image dimension before OCR
pub const DEFAULT_TARGET_MAX_DIM: u32 = 1600;

/// Which images get rescaled towards the target dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizePolicy {
    /// Scale small images up and large images down
    #[default]
    Normalize,
    /// Only scale images smaller than the target up
    UpscaleOnly,
    /// Only scale images larger than the target down
    DownscaleOnly,
}

/// Rescale proportionally so the larger dimension equals `target_max_dim`
pub fn apply(image: GrayImage, policy: ResizePolicy, target_max_dim: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let max_dim = width.max(height);

    if max_dim == 0 || target_max_dim == 0 || max_dim == target_max_dim {
        return image;
    }

    let upscale = max_dim < target_max_dim;
    let allowed = match policy {
        ResizePolicy::Normalize => true,
        ResizePolicy::UpscaleOnly => upscale,
        ResizePolicy::DownscaleOnly => !upscale,
    };
    if !allowed {
        return image;
    }

    let scale = target_max_dim as f32 / max_dim as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    // Cubic when enlarging, area-like when shrinking
    let filter = if upscale {
        FilterType::CatmullRom
    } else {
        FilterType::Triangle
    };

    imageops::resize(&image, new_width, new_height, filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_upscales_small_image() {
        let img = GrayImage::new(400, 200);
        let result = apply(img, ResizePolicy::Normalize, 1600);
        assert_eq!(result.dimensions(), (1600, 800));
    }

    #[test]
    fn test_resize_downscales_large_image() {
        let img = GrayImage::new(1000, 3200);
        let result = apply(img, ResizePolicy::Normalize, 1600);
        assert_eq!(result.dimensions(), (500, 1600));
    }

    #[test]
    fn test_resize_respects_one_directional_policies() {
        let small = GrayImage::new(100, 50);
        let large = GrayImage::new(2000, 1000);

        assert_eq!(
            apply(small.clone(), ResizePolicy::DownscaleOnly, 1600).dimensions(),
            (100, 50)
        );
        assert_eq!(
            apply(large.clone(), ResizePolicy::UpscaleOnly, 1600).dimensions(),
            (2000, 1000)
        );
        assert_eq!(
            apply(small, ResizePolicy::UpscaleOnly, 1600).dimensions(),
            (1600, 800)
        );
        assert_eq!(
            apply(large, ResizePolicy::DownscaleOnly, 1600).dimensions(),
            (1600, 800)
        );
    }

    #[test]
    fn test_resize_keeps_image_at_target() {
        let img = GrayImage::new(1600, 900);
        assert_eq!(apply(img, ResizePolicy::Normalize, 1600).dimensions(), (1600, 900));
    }
}
