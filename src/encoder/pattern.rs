//! Builtin fallback: a deterministic, QR-looking module grid.
//!
//! The grid is a visual placeholder. It carries finder markers so it reads as
//! a code to a person, but it is not decodable by a standards reader.

use crate::error::EncodeError;
use crate::models::{BitMatrix, RenderOptions};
use crate::utils::hash::{hash32, lcg_next};
use image::RgbaImage;

/// Modules per side of the synthetic grid
pub const GRID_SIZE: usize = 25;

/// Side of each reserved corner zone
pub const FINDER_ZONE: usize = 9;

/// Side of the finder marker stamped into each zone
pub const FINDER_SIZE: usize = 7;

/// Pixels of quiet zone per unit of `RenderOptions::margin`
const MARGIN_UNIT: u32 = 8;

/// Concentric ring marker: 7x7 dark ring, light ring, 3x3 dark core
const FINDER_MARKER: [[bool; FINDER_SIZE]; FINDER_SIZE] = {
    const D: bool = true;
    const L: bool = false;
    [
        [D, D, D, D, D, D, D],
        [D, L, L, L, L, L, D],
        [D, L, D, D, D, L, D],
        [D, L, D, D, D, L, D],
        [D, L, D, D, D, L, D],
        [D, L, L, L, L, L, D],
        [D, D, D, D, D, D, D],
    ]
};

/// True for cells in the top-left, top-right or bottom-left reserved zone
pub fn is_finder_zone(x: usize, y: usize, size: usize) -> bool {
    let near = |v: usize| v < FINDER_ZONE;
    let far = |v: usize| v >= size.saturating_sub(FINDER_ZONE);
    (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y))
}

/// Top-left module of each finder marker: TL, TR, BL
pub fn finder_origins(size: usize) -> [(usize, usize); 3] {
    let far = size - FINDER_SIZE;
    [(0, 0), (far, 0), (0, far)]
}

/// Value a module inside a reserved zone must take: the marker where one is
/// stamped, light elsewhere
pub fn finder_stamp(x: usize, y: usize, size: usize) -> bool {
    finder_origins(size).iter().any(|&(ox, oy)| {
        x >= ox
            && y >= oy
            && x < ox + FINDER_SIZE
            && y < oy + FINDER_SIZE
            && FINDER_MARKER[y - oy][x - ox]
    })
}

/// Synthetic fill only (zones left light), seeded from `hash32(data)`.
///
/// Cells are visited row-major and the LCG advances once per non-zone cell.
pub fn synthetic_fill(data: &str, size: usize) -> BitMatrix {
    let mut seed = hash32(data);
    let mut grid = BitMatrix::square(size);

    for y in 0..size {
        for x in 0..size {
            if is_finder_zone(x, y, size) {
                continue;
            }
            seed = lcg_next(seed);
            grid.set(x, y, seed % 100 < 50);
        }
    }

    grid
}

/// Final module grid: synthetic fill with the three finder markers stamped on
pub fn pattern_modules(data: &str) -> BitMatrix {
    let mut grid = synthetic_fill(data, GRID_SIZE);
    for &(ox, oy) in &finder_origins(GRID_SIZE) {
        for (dy, row) in FINDER_MARKER.iter().enumerate() {
            for (dx, &dark) in row.iter().enumerate() {
                if dark {
                    grid.set(ox + dx, oy + dy, true);
                }
            }
        }
    }
    grid
}

/// Rasterize the pattern for `data` with the given options
pub fn render_pattern(data: &str, options: &RenderOptions) -> Result<RgbaImage, EncodeError> {
    if data.is_empty() {
        return Err(EncodeError::Encoding("empty payload".into()));
    }
    if options.width == 0 || options.height == 0 {
        return Err(EncodeError::Encoding(format!(
            "raster must be non-empty, got {}x{}",
            options.width, options.height
        )));
    }

    let start = options.margin.saturating_mul(MARGIN_UNIT);
    // Square grid sized to the shorter side; the longer side keeps light padding
    let side = options.width.min(options.height);
    let usable = side.saturating_sub(start.saturating_mul(2));
    let cell = usable / GRID_SIZE as u32;
    if cell == 0 {
        return Err(EncodeError::Encoding(format!(
            "{}x{} raster with margin {} is too small for a {GRID_SIZE}x{GRID_SIZE} grid",
            options.width, options.height, options.margin
        )));
    }

    let modules = pattern_modules(data);
    let mut img = RgbaImage::from_pixel(options.width, options.height, options.light);
    for (x, y) in modules.iter_set() {
        let px = start + x as u32 * cell;
        let py = start + y as u32 * cell;
        for dy in 0..cell {
            for dx in 0..cell {
                img.put_pixel(px + dx, py + dy, options.dark);
            }
        }
    }

    Ok(img)
}
