//! Code localisation in captured frames
//!
//! Only finder-marker detection lives here. It is enough to tell whether a
//! frame plausibly shows a code, which gates the (more expensive or
//! simulated) payload decoder.

/// Finder pattern detection using 1:1:3:1:1 ratio scanning
pub mod finder;

pub use finder::{FinderDetector, FinderPattern};

use crate::models::BitMatrix;
use crate::utils::binarization::otsu_binarize;
use crate::utils::grayscale::frame_to_grayscale;
use image::RgbaImage;

/// Binarize an RGBA frame and locate finder markers in it
pub fn locate_finders(frame: &RgbaImage) -> Vec<FinderPattern> {
    FinderDetector::detect(&binarize_frame(frame))
}

/// Grayscale + Otsu threshold of an RGBA frame
pub fn binarize_frame(frame: &RgbaImage) -> BitMatrix {
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let gray = frame_to_grayscale(frame.as_raw(), width, height);
    otsu_binarize(&gray, width, height)
}
