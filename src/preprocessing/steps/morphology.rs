use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Morphological closing with a 3x3 square on the white layer
/// Fills pinholes in the background and smooths ragged binarization
pub fn close(image: &GrayImage) -> GrayImage {
    morphology::close(image, Norm::LInf, 1)
}
