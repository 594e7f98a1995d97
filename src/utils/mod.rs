//! Utility functions shared by the encoder and the scanner
//!
//! - Grayscale conversion of captured RGBA frames
//! - Binarization (Otsu's method and fixed threshold)
//! - The 32-bit string hash and LCG used for signatures and synthetic fill

pub mod binarization;
pub mod grayscale;
pub mod hash;
