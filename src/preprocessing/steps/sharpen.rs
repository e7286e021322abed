use image::GrayImage;
use imageproc::filter::filter3x3;

/// 3x3 Laplacian sharpening: the pixel counts five times, its four direct
/// neighbours are subtracted
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

pub fn apply(image: &GrayImage) -> GrayImage {
    filter3x3(image, &SHARPEN_KERNEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_flat_regions_unchanged() {
        let img = GrayImage::from_pixel(9, 9, Luma([128]));
        assert_eq!(apply(&img), img);
    }

    #[test]
    fn test_faint_stroke_gets_darker_and_paper_brighter() {
        // Light gray paper with a slightly darker vertical stroke
        let img = GrayImage::from_fn(11, 11, |x, _| {
            if x == 5 {
                Luma([150])
            } else {
                Luma([200])
            }
        });

        let result = apply(&img);

        // 5 * 150 - 2 * 200 - 2 * 150
        assert_eq!(result[(5, 5)].0[0], 50);
        // 5 * 200 - 150 - 3 * 200
        assert_eq!(result[(4, 5)].0[0], 250);
        assert_eq!(result[(1, 5)].0[0], 200);
    }
}
