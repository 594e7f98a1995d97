//! Helpers for the CLI, benches and file-backed cameras

use crate::models::BitMatrix;
use image::{GenericImageView, RgbaImage};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

fn max_dim_from_env() -> Option<u32> {
    match env::var("TICKET_QR_MAX_FRAME_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) | Err(_) => None,
            Ok(v) => Some(v),
        },
        Err(_) => None,
    }
}

/// Load an image as an RGBA frame, downscaled so its longer side does not
/// exceed `TICKET_QR_MAX_FRAME_DIM` when that is set.
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage, image::ImageError> {
    let img = image::open(path)?;
    let Some(max_dim) = max_dim_from_env() else {
        return Ok(img.to_rgba8());
    };
    let (w, h) = img.dimensions();
    if w.max(h) > max_dim {
        Ok(img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_rgba8())
    } else {
        Ok(img.to_rgba8())
    }
}

/// Image files under `root`, recursively, in sorted order
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let is_image = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if is_image {
                images.push(path);
            }
        }
    }

    images.sort();
    images
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayStats {
    pub min: u8,
    pub max: u8,
    pub avg: u8,
}

/// Summary statistics for a binary matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryStats {
    pub dark_pixels: usize,
    pub total_pixels: usize,
    pub dark_ratio: f64,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    if gray.is_empty() {
        return GrayStats { min: 0, max: 0, avg: 0 };
    }
    let (min, max, sum) = gray.iter().fold((u8::MAX, u8::MIN, 0u64), |(lo, hi, sum), &v| {
        (lo.min(v), hi.max(v), sum + v as u64)
    });
    GrayStats {
        min,
        max,
        avg: (sum / gray.len() as u64) as u8,
    }
}

/// Compute dark pixel stats for a binary matrix.
pub fn binary_stats(binary: &BitMatrix) -> BinaryStats {
    let dark = binary.count_set();
    let total = binary.width() * binary.height();
    BinaryStats {
        dark_pixels: dark,
        total_pixels: total,
        dark_ratio: if total == 0 { 0.0 } else { dark as f64 / total as f64 },
    }
}
