use crate::models::BitMatrix;

/// Convert a grayscale frame to binary using Otsu's thresholding method.
/// Returns a BitMatrix where true = dark module, false = light
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = otsu_threshold(gray);
    threshold_binarize(gray, width, height, threshold)
}

/// Otsu's optimal threshold over a 256-bin histogram.
///
/// Uses running class sums so the search is a single pass over the histogram.
pub fn otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    if total == 0.0 {
        return 128;
    }
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut below_count = 0.0f64;
    let mut below_sum = 0.0f64;
    let mut max_variance = 0.0f64;
    let mut optimal = 128u8;

    // Pixels strictly below `threshold` are dark
    for threshold in 1..=255usize {
        let count = histogram[threshold - 1] as f64;
        below_count += count;
        below_sum += (threshold - 1) as f64 * count;

        let above_count = total - below_count;
        if below_count == 0.0 || above_count == 0.0 {
            continue;
        }

        let mean_below = below_sum / below_count;
        let mean_above = (total_sum - below_sum) / above_count;
        let w1 = below_count / total;
        let w2 = above_count / total;
        let variance = w1 * w2 * (mean_below - mean_above).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal = threshold as u8;
        }
    }

    optimal
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            binary.set(x, y, gray[idx] < threshold);
        }
    }

    binary
}
