/// Bitmap text and rectangle primitives over an RGBA canvas
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};

/// Glyph cell edge in font pixels
pub const GLYPH_PX: u32 = 8;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    /// `x` is the horizontal center of the run
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Integer upscale of the 8x8 glyphs
    pub scale: u32,
    pub color: Rgba<u8>,
    /// Draw each glyph twice, one pixel apart
    pub bold: bool,
}

impl TextStyle {
    pub const fn new(scale: u32, color: Rgba<u8>) -> Self {
        Self {
            scale,
            color,
            bold: false,
        }
    }

    pub const fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    fn advance(&self) -> u32 {
        GLYPH_PX * self.scale.max(1)
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Rendered width of `text` in pixels
pub fn text_width(text: &str, style: &TextStyle) -> u32 {
    text.chars().count() as u32 * style.advance()
}

/// Shorten `text` so it renders within `max_width`, marking the cut with "..."
pub fn fit_to_width(text: &str, style: &TextStyle, max_width: u32) -> String {
    if text_width(text, style) <= max_width {
        return text.to_string();
    }

    let max_chars = (max_width / style.advance()) as usize;
    if max_chars <= ELLIPSIS.len() {
        return ELLIPSIS.chars().take(max_chars).collect();
    }

    let mut out: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}

/// Draw `text` with its baseline at `baseline`. Pixels outside the canvas are
/// dropped.
pub fn draw_text(canvas: &mut RgbaImage, text: &str, x: i64, baseline: i64, style: &TextStyle, align: Align) {
    let scale = style.scale.max(1) as i64;
    let left = match align {
        Align::Left => x,
        Align::Center => x - text_width(text, style) as i64 / 2,
    };
    // Row 7 of the font is the descender row
    let top = baseline - 7 * scale;

    for (i, c) in text.chars().enumerate() {
        let gx = left + i as i64 * style.advance() as i64;
        let rows = glyph(c);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..8 {
                if (*bits >> col) & 1 == 0 {
                    continue;
                }
                let px = gx + col * scale;
                let py = top + row as i64 * scale;
                fill_rect(canvas, px, py, scale as u32, scale as u32, style.color);
                if style.bold {
                    fill_rect(canvas, px + 1, py, scale as u32, scale as u32, style.color);
                }
            }
        }
    }
}

/// Fill an axis-aligned rectangle, clipped to the canvas
pub fn fill_rect(canvas: &mut RgbaImage, x: i64, y: i64, w: u32, h: u32, color: Rgba<u8>) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w as i64).min(canvas.width() as i64);
    let y1 = (y + h as i64).min(canvas.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px as u32, py as u32, color);
        }
    }
}

/// Outline a rectangle with a band `line` pixels wide centered on its edges
pub fn stroke_rect(canvas: &mut RgbaImage, x: i64, y: i64, w: u32, h: u32, line: u32, color: Rgba<u8>) {
    let half = line as i64 / 2;
    let (ox, oy) = (x - half, y - half);
    let (ow, oh) = (w + line, h + line);
    fill_rect(canvas, ox, oy, ow, line, color);
    fill_rect(canvas, ox, oy + oh as i64 - line as i64, ow, line, color);
    fill_rect(canvas, ox, oy, line, oh, color);
    fill_rect(canvas, ox + ow as i64 - line as i64, oy, line, oh, color);
}

/// Linear top-to-bottom blend from `from` to `to`
pub fn vertical_gradient(canvas: &mut RgbaImage, from: Rgba<u8>, to: Rgba<u8>) {
    let span = canvas.height().saturating_sub(1).max(1) as i32;
    for (_, y, pixel) in canvas.enumerate_pixels_mut() {
        let t = y as i32;
        let mut mixed = [0u8; 4];
        for (c, out) in mixed.iter_mut().enumerate() {
            let a = from.0[c] as i32;
            let b = to.0[c] as i32;
            *out = (a + (b - a) * t / span) as u8;
        }
        *pixel = Rgba(mixed);
    }
}
