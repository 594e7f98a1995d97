/// Finder marker detection using 1:1:3:1:1 run-length scanning
use crate::models::{BitMatrix, Point};

/// A located finder marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    pub center: Point,
    pub module_size: f32,
}

impl FinderPattern {
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
        }
    }
}

pub struct FinderDetector;

impl FinderDetector {
    /// Smallest marker width in pixels worth reporting (7 modules of 3px)
    const MIN_MARKER_PX: usize = 21;
    /// Candidates closer than this are the same marker
    const MERGE_DIST: f32 = 5.0;
    /// Stop scanning a row after this many hits
    const MAX_PATTERNS_PER_ROW: usize = 5;

    pub fn detect(matrix: &BitMatrix) -> Vec<FinderPattern> {
        let width = matrix.width();
        let mut candidates = Vec::new();

        for y in 0..matrix.height() {
            // Rows without edges cannot contain a marker
            if !Self::has_significant_edges(matrix, y, width) {
                continue;
            }
            candidates.extend(Self::scan_row(matrix, y, width));
        }

        Self::merge_candidates(candidates)
    }

    /// Sample every 4th pixel and look for at least two color changes
    fn has_significant_edges(matrix: &BitMatrix, y: usize, width: usize) -> bool {
        let mut transitions = 0;
        let mut prev = matrix.get(0, y);

        for x in (4..width).step_by(4) {
            let color = matrix.get(x, y);
            if color != prev {
                transitions += 1;
                prev = color;
                if transitions >= 3 {
                    return true;
                }
            }
        }

        transitions >= 2
    }

    fn scan_row(matrix: &BitMatrix, y: usize, width: usize) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        let mut runs: Vec<(bool, usize)> = Vec::new();
        let mut run_start = 0usize;
        let mut current = matrix.get(0, y);

        // A sentinel step at `width` closes the final run
        for x in 1..=width {
            let color = if x < width { matrix.get(x, y) } else { !current };
            if color == current {
                continue;
            }

            runs.push((current, x - run_start));
            run_start = x;
            current = color;

            if runs.len() < 5 {
                continue;
            }
            let window = &runs[runs.len() - 5..];
            let dark_light_dark = window[0].0 && !window[1].0 && window[2].0 && !window[3].0 && window[4].0;
            if !dark_light_dark {
                continue;
            }

            let lengths = [window[0].1, window[1].1, window[2].1, window[3].1, window[4].1];
            if Self::quick_ratio_check(&lengths) {
                if let Some(pattern) = Self::check_pattern(&lengths, x, y) {
                    candidates.push(pattern);
                    if candidates.len() >= Self::MAX_PATTERNS_PER_ROW {
                        break;
                    }
                }
            }
        }

        candidates
    }

    /// Integer pre-check before the floating point ratio test
    fn quick_ratio_check(lengths: &[usize; 5]) -> bool {
        let [b1, w1, b2, w2, b3] = *lengths;
        let total = b1 + w1 + b2 + w2 + b3;
        if total < Self::MIN_MARKER_PX {
            return false;
        }

        // Core should be roughly 2-5x the outer dark runs
        let outer_min = b1.min(b3);
        if b2 < outer_min * 2 || b2 > outer_min * 5 {
            return false;
        }

        let outer_avg = (b1 + b3 + w1 + w2) / 4;
        let w1_ok = w1 >= outer_avg / 2 && w1 <= outer_avg * 2;
        let w2_ok = w2 >= outer_avg / 2 && w2 <= outer_avg * 2;
        w1_ok && w2_ok
    }

    fn check_pattern(lengths: &[usize; 5], end_x: usize, y: usize) -> Option<FinderPattern> {
        let total: usize = lengths.iter().sum();
        let unit = total as f32 / 7.0;
        let expected = [1.0, 1.0, 3.0, 1.0, 1.0];

        const TOL: f32 = 0.5;
        let within = lengths
            .iter()
            .zip(expected)
            .all(|(&len, want)| (len as f32 / unit - want).abs() <= TOL);
        if !within {
            return None;
        }

        let [_, _, b2, w2, b3] = *lengths;
        let center_x = end_x as f32 - b3 as f32 - w2 as f32 - b2 as f32 / 2.0;
        Some(FinderPattern::new(center_x, y as f32, unit))
    }

    fn merge_candidates(candidates: Vec<FinderPattern>) -> Vec<FinderPattern> {
        let mut merged: Vec<FinderPattern> = Vec::new();

        for candidate in candidates {
            let existing = merged.iter_mut().find(|m| {
                m.center.distance_squared(&candidate.center) < Self::MERGE_DIST * Self::MERGE_DIST
            });
            match existing {
                Some(m) => {
                    m.center = m.center.midpoint(&candidate.center);
                    m.module_size = (m.module_size + candidate.module_size) / 2.0;
                }
                None => merged.push(candidate),
            }
        }

        merged
    }
}
