use image::{DynamicImage, GrayImage};

/// Single-channel luma of the photo; every later step works on this
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_luma_weights_green_above_red_above_blue() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });

        let gray = apply(&DynamicImage::ImageRgb8(img));
        let (red, green, blue) = (gray[(0, 0)].0[0], gray[(1, 0)].0[0], gray[(2, 0)].0[0]);

        assert!(green > red && red > blue, "{} {} {}", red, green, blue);
    }

    #[test]
    fn test_paper_and_ink_keep_their_extremes() {
        let img = RgbImage::from_fn(40, 20, |x, _| {
            if x < 20 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });

        let gray = apply(&DynamicImage::ImageRgb8(img));

        assert_eq!(gray.dimensions(), (40, 20));
        assert_eq!(gray[(0, 0)].0[0], 255);
        assert_eq!(gray[(39, 19)].0[0], 0);
    }
}
