//! Ticket image composition
//!
//! Lays an encoded code and the ticket's details out on a fixed 600x800
//! canvas. Output depends only on the inputs, so the same ticket rendered
//! on the same day produces byte-identical PNGs.

/// Download and share of composed tickets
pub mod export;
/// Bitmap text and rectangle primitives
pub mod text;

pub use export::{DirectorySink, ExportOutcome, ImageSink, ShareFile, ShareTarget, TicketExporter};

use crate::encoder::EncodedRaster;
use crate::error::ComposeError;
use crate::models::{EventMeta, TicketPayload};
use chrono::NaiveDate;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use text::{Align, TextStyle, draw_text, fill_rect, fit_to_width, stroke_rect, vertical_gradient};
use tracing::debug;

pub const TICKET_WIDTH: u32 = 600;
pub const TICKET_HEIGHT: u32 = 800;

/// Edge of the code block on the ticket
pub const CODE_SIZE: u32 = 200;
/// Top-left corner of the code block
pub const CODE_ORIGIN: (u32, u32) = ((TICKET_WIDTH - CODE_SIZE) / 2, 420);

const BRAND: Rgba<u8> = Rgba([0x00, 0x7b, 0xff, 0xff]);
const INNER_RULE: Rgba<u8> = Rgba([0xde, 0xe2, 0xe6, 0xff]);
const BACKGROUND_TOP: Rgba<u8> = Rgba([0xf8, 0xf9, 0xfa, 0xff]);
const BACKGROUND_BOTTOM: Rgba<u8> = Rgba([0xe9, 0xec, 0xef, 0xff]);
const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
const BODY: Rgba<u8> = Rgba([0x33, 0x33, 0x33, 0xff]);
const MUTED: Rgba<u8> = Rgba([0x66, 0x66, 0x66, 0xff]);

const TEXT_LEFT: i64 = 50;
const TEXT_MAX_WIDTH: u32 = TICKET_WIDTH - 2 * TEXT_LEFT as u32;
const CODE_PAD: u32 = 10;

/// A composed ticket
#[derive(Debug, Clone, PartialEq)]
pub struct TicketImage {
    image: RgbaImage,
}

impl TicketImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Serialize as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, ComposeError> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            ColorType::Rgba8,
        )?;
        Ok(bytes)
    }
}

/// Compose the ticket image for `payload`.
///
/// `event` supplies the title, date and location drawn under "Event:"; an
/// empty title falls back to the payload's own. `generated_on` is printed in
/// the footer.
pub fn compose(
    raster: &EncodedRaster,
    payload: &TicketPayload,
    event: &EventMeta,
    generated_on: NaiveDate,
) -> TicketImage {
    let mut canvas = RgbaImage::new(TICKET_WIDTH, TICKET_HEIGHT);
    vertical_gradient(&mut canvas, BACKGROUND_TOP, BACKGROUND_BOTTOM);
    stroke_rect(&mut canvas, 10, 10, TICKET_WIDTH - 20, TICKET_HEIGHT - 20, 3, BRAND);
    stroke_rect(&mut canvas, 20, 20, TICKET_WIDTH - 40, TICKET_HEIGHT - 40, 1, INNER_RULE);

    draw_header(&mut canvas);
    draw_details(&mut canvas, payload, event);
    draw_code(&mut canvas, &raster.image);
    draw_footer(&mut canvas, generated_on);

    debug!(
        ticket_id = %payload.ticket_id,
        source = ?raster.source,
        "composed ticket image"
    );
    TicketImage { image: canvas }
}

fn draw_header(canvas: &mut RgbaImage) {
    fill_rect(canvas, 30, 30, TICKET_WIDTH - 60, 80, BRAND);
    let center = TICKET_WIDTH as i64 / 2;
    draw_text(canvas, "BLANKROOMS", center, 70, &TextStyle::new(4, WHITE).bold(), Align::Center);
    draw_text(canvas, "EVENT TICKET", center, 98, &TextStyle::new(2, WHITE), Align::Center);
}

fn draw_details(canvas: &mut RgbaImage, payload: &TicketPayload, event: &EventMeta) {
    let label = TextStyle::new(2, BODY).bold();
    let value = TextStyle::new(2, BODY);

    let title = if event.title.is_empty() {
        &payload.event_title
    } else {
        &event.title
    };
    let when_where = match (event.date.is_empty(), event.location.is_empty()) {
        (false, false) => format!("{} \u{b7} {}", event.date, event.location),
        (false, true) => event.date.clone(),
        (true, false) => event.location.clone(),
        (true, true) => String::new(),
    };

    let rows = [
        ("Event:", 150, title.clone(), 180),
        ("Ticket Type:", 220, payload.ticket_type.clone(), 250),
        ("Quantity:", 290, format!("x{}", payload.quantity), 320),
        ("Ticket ID:", 360, payload.qr_code.clone(), 390),
    ];
    for (caption, caption_y, text, text_y) in rows {
        let caption_style = if caption == "Event:" {
            TextStyle::new(3, BODY).bold()
        } else {
            label
        };
        draw_text(canvas, caption, TEXT_LEFT, caption_y, &caption_style, Align::Left);
        let fitted = fit_to_width(&text, &value, TEXT_MAX_WIDTH);
        draw_text(canvas, &fitted, TEXT_LEFT, text_y, &value, Align::Left);
    }

    if !when_where.is_empty() {
        let small = TextStyle::new(1, MUTED);
        let fitted = fit_to_width(&when_where, &small, TEXT_MAX_WIDTH);
        draw_text(canvas, &fitted, TEXT_LEFT, 198, &small, Align::Left);
    }
}

fn draw_code(canvas: &mut RgbaImage, code: &RgbaImage) {
    let (x, y) = CODE_ORIGIN;
    let padded = CODE_SIZE + 2 * CODE_PAD;
    let (px, py) = (x as i64 - CODE_PAD as i64, y as i64 - CODE_PAD as i64);
    fill_rect(canvas, px, py, padded, padded, WHITE);
    stroke_rect(canvas, px, py, padded, padded, 2, BRAND);

    let scaled = if code.dimensions() == (CODE_SIZE, CODE_SIZE) {
        code.clone()
    } else {
        imageops::resize(code, CODE_SIZE, CODE_SIZE, FilterType::Nearest)
    };
    imageops::replace(canvas, &scaled, x as i64, y as i64);
}

fn draw_footer(canvas: &mut RgbaImage, generated_on: NaiveDate) {
    let style = TextStyle::new(1, MUTED);
    let center = TICKET_WIDTH as i64 / 2;
    let generated = format!("Generated on {}", generated_on.format("%d/%m/%Y"));
    for (line, y) in [
        ("Present this ticket at the event entrance", 680),
        (generated.as_str(), 700),
        ("BLANKROOMS Event Management System", 720),
    ] {
        draw_text(canvas, line, center, y, &style, Align::Center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{RasterSource, TicketCodeGenerator};
    use crate::models::RenderOptions;
    use chrono::{TimeZone, Utc};

    fn fixture() -> (EncodedRaster, TicketPayload) {
        let payload = TicketPayload::demo(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let raster = TicketCodeGenerator::builtin()
            .encode_payload(&payload, &RenderOptions::ticket())
            .unwrap();
        (raster, payload)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_fixed_dimensions() {
        let (raster, mut payload) = fixture();
        payload.event_title = "A".repeat(500);
        payload.ticket_type = "B".repeat(500);
        let image = compose(&raster, &payload, &EventMeta::default(), day());
        assert_eq!((image.width(), image.height()), (TICKET_WIDTH, TICKET_HEIGHT));
    }

    #[test]
    fn test_deterministic_png() {
        let (raster, payload) = fixture();
        let meta = EventMeta {
            title: "Shang-Chi".into(),
            date: "3 March 2025".into(),
            location: "Newcastle, UK".into(),
        };
        let a = compose(&raster, &payload, &meta, day()).to_png().unwrap();
        let b = compose(&raster, &payload, &meta, day()).to_png().unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[1..4], b"PNG");

        let later = compose(&raster, &payload, &meta, day().succ_opt().unwrap())
            .to_png()
            .unwrap();
        assert_ne!(a, later);
    }

    #[test]
    fn test_layout_landmarks() {
        let (raster, payload) = fixture();
        let image = compose(&raster, &payload, &EventMeta::default(), day());
        let px = |x, y| *image.as_image().get_pixel(x, y);

        assert_eq!(px(10, 400), BRAND, "outer border");
        assert_eq!(px(20, 400), INNER_RULE, "inner border");
        assert_eq!(px(35, 35), BRAND, "header band");
        assert_eq!(px(195, 600), WHITE, "code pad");
        assert_eq!(px(190, 600), BRAND, "code border");
        assert_eq!(px(0, 0), BACKGROUND_TOP);
        assert_eq!(px(0, TICKET_HEIGHT - 1), BACKGROUND_BOTTOM);
    }

    #[test]
    fn test_code_is_scaled_into_block() {
        let payload = TicketPayload::demo(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let small = EncodedRaster {
            image: RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255])),
            source: RasterSource::Synthetic,
        };
        let image = compose(&small, &payload, &EventMeta::default(), day());
        let (x, y) = CODE_ORIGIN;
        assert_eq!(*image.as_image().get_pixel(x, y), Rgba([0, 0, 0, 255]));
        assert_eq!(
            *image.as_image().get_pixel(x + CODE_SIZE - 1, y + CODE_SIZE - 1),
            Rgba([0, 0, 0, 255])
        );
        assert_eq!(*image.as_image().get_pixel(x + CODE_SIZE + 2, y), WHITE);
    }
}
