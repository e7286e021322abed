use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_with, Interpolation};
use imageproc::geometry::{convex_hull, min_area_rect};
use imageproc::point::Point;

/// Corrections smaller than this (degrees) are reported but not applied
const MIN_CORRECTION_DEGREES: f32 = 0.1;

/// Deskew a binarized image by rotating its text block level
/// Returns the corrected image and the corrective angle in degrees
pub fn apply(image: GrayImage) -> (GrayImage, f32) {
    let angle = match detect_skew_angle(&image) {
        Some(angle) => angle,
        None => return (image, 0.0),
    };

    if angle.abs() < MIN_CORRECTION_DEGREES {
        return (image, angle);
    }

    (rotate_replicate(&image, angle), angle)
}

/// Corrective rotation (degrees, clockwise positive) derived from the
/// minimum-area rectangle around all foreground pixels.
///
/// `None` when there is no foreground or the foreground is degenerate
/// (a single point or a straight run of pixels).
pub fn detect_skew_angle(img: &GrayImage) -> Option<f32> {
    let points: Vec<Point<i32>> = img
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel.0[0] < 255)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    if points.is_empty() {
        return None;
    }

    let hull = convex_hull(points.as_slice());
    if hull.len() < 3 {
        return None;
    }

    let rect = min_area_rect(&hull);
    Some(corrective_angle(rect_angle(&rect)))
}

/// Angle of the rectangle's edges, folded into [-90, 0)
fn rect_angle(rect: &[Point<i32>; 4]) -> f32 {
    // Corners are rounded to whole pixels, so measure along the longer edge
    let edge = |a: Point<i32>, b: Point<i32>| ((b.x - a.x) as f32, (b.y - a.y) as f32);
    let first = edge(rect[0], rect[1]);
    let second = edge(rect[1], rect[2]);
    let (dx, dy) = if first.0.hypot(first.1) >= second.0.hypot(second.1) {
        first
    } else {
        second
    };

    dy.atan2(dx).to_degrees().rem_euclid(90.0) - 90.0
}

/// Map a rectangle angle in [-90, 0) to the rotation that levels it.
/// Below -45 the block is taller than wide on that edge, so the
/// complementary angle is used.
pub fn corrective_angle(angle: f32) -> f32 {
    if angle < -45.0 {
        -(90.0 + angle)
    } else {
        -angle
    }
}

/// Rotate clockwise about the center, keeping the canvas size and
/// replicating edge pixels instead of filling with a background color
fn rotate_replicate(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let (sin, cos) = degrees.to_radians().sin_cos();

    // Stay inside the bilinear footprint so edge samples clamp to real pixels
    let max_x = (width as f32 - 1.001).max(0.0);
    let max_y = (height as f32 - 1.001).max(0.0);

    warp_with(
        image,
        move |x, y| {
            let dx = x - cx;
            let dy = y - cy;
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;
            (sx.clamp(0.0, max_x), sy.clamp(0.0, max_y))
        },
        Interpolation::Bilinear,
        Luma([255u8]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::drawing::draw_line_segment_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_deskew_detects_zero_angle_for_straight_block() {
        let mut img = GrayImage::from_pixel(100, 50, Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(10, 20).of_size(80, 6), Luma([0]));

        let angle = detect_skew_angle(&img).unwrap();

        assert!(angle.abs() < 0.5, "Expected near-zero angle, got {}", angle);
    }

    #[test]
    fn test_deskew_detects_tilted_line() {
        // Rises 20px over 160px: about 7.1 degrees counter-clockwise
        let mut img = GrayImage::from_pixel(200, 100, Luma([255]));
        for offset in 0..3 {
            draw_line_segment_mut(
                &mut img,
                (20.0, 60.0 + offset as f32),
                (180.0, 40.0 + offset as f32),
                Luma([0]),
            );
        }

        let angle = detect_skew_angle(&img).unwrap();

        assert!(
            (angle - 7.1).abs() < 1.0,
            "Expected about 7.1 degrees, got {}",
            angle
        );
    }

    #[test]
    fn test_corrective_angle_folds_quadrants() {
        assert_eq!(corrective_angle(-10.0), 10.0);
        assert_eq!(corrective_angle(-80.0), -10.0);
        assert_eq!(corrective_angle(-90.0), 0.0);
    }

    #[test]
    fn test_blank_image_is_left_alone() {
        let img = GrayImage::from_pixel(100, 50, Luma([255]));
        let (result, angle) = apply(img.clone());
        assert_eq!(angle, 0.0);
        assert_eq!(result, img);
    }

    #[test]
    fn test_single_pixel_is_degenerate() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([255]));
        img.put_pixel(3, 4, Luma([0]));
        assert_eq!(detect_skew_angle(&img), None);
    }

    #[test]
    fn test_deskew_preserves_dimensions_and_replicates_border() {
        let mut img = GrayImage::from_pixel(120, 60, Luma([255]));
        draw_line_segment_mut(&mut img, (10.0, 40.0), (110.0, 20.0), Luma([0]));
        draw_line_segment_mut(&mut img, (10.0, 41.0), (110.0, 21.0), Luma([0]));

        let (result, angle) = apply(img);

        assert!(angle.abs() > MIN_CORRECTION_DEGREES);
        assert_eq!(result.dimensions(), (120, 60));
        // Corners sample the white border, not a fill color
        assert_eq!(result.get_pixel(0, 0).0[0], 255);
        assert_eq!(result.get_pixel(119, 59).0[0], 255);
    }
}
