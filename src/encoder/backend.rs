use crate::error::EncodeError;
use crate::models::RenderOptions;
use image::RgbaImage;
use qrcode::QrCode;
use std::time::{Duration, Instant};
use tracing::debug;

/// A standards-compliant QR encoder that may or may not be usable
pub trait SymbolEncoder: Send + Sync {
    /// Whether the encoder can take requests right now
    fn is_ready(&self) -> bool {
        true
    }

    /// Encode `data` into a raster of exactly `options.width` x `options.height`
    fn encode(&self, data: &str, options: &RenderOptions) -> Result<RgbaImage, EncodeError>;
}

/// Standards encoder backed by the `qrcode` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct QrcodeEncoder;

impl SymbolEncoder for QrcodeEncoder {
    fn encode(&self, data: &str, options: &RenderOptions) -> Result<RgbaImage, EncodeError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), options.ec_level.to_qrcode())
            .map_err(|e| EncodeError::Backend(e.to_string()))?;
        let modules = code.width();
        let colors = code.to_colors();

        // Integer scale so every module has the same pixel footprint
        let span = modules as u32 + 2 * options.margin;
        let scale = options.width.min(options.height) / span;
        if scale == 0 {
            return Err(EncodeError::Backend(format!(
                "{modules}-module code with margin {} does not fit {}x{}",
                options.margin, options.width, options.height
            )));
        }

        let offset_x = (options.width - modules as u32 * scale) / 2;
        let offset_y = (options.height - modules as u32 * scale) / 2;
        let mut img = RgbaImage::from_pixel(options.width, options.height, options.light);

        for (i, color) in colors.iter().enumerate() {
            if *color != qrcode::Color::Dark {
                continue;
            }
            let x = (i % modules) as u32;
            let y = (i / modules) as u32;
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(offset_x + x * scale + dx, offset_y + y * scale + dy, options.dark);
                }
            }
        }

        Ok(img)
    }
}

/// Poll `encoder.is_ready()` every `poll` until it reports ready or `timeout`
/// elapses.
pub fn wait_until_ready<E: SymbolEncoder + ?Sized>(
    encoder: &E,
    timeout: Duration,
    poll: Duration,
) -> Result<(), EncodeError> {
    let started = Instant::now();
    loop {
        if encoder.is_ready() {
            debug!(waited_ms = started.elapsed().as_millis() as u64, "QR encoder ready");
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(EncodeError::LibraryUnavailable(timeout));
        }
        let remaining = timeout.saturating_sub(started.elapsed());
        std::thread::sleep(poll.min(remaining).max(Duration::from_millis(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ECLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ReadyAfter {
        polls: AtomicUsize,
        ready_at: usize,
    }

    impl SymbolEncoder for ReadyAfter {
        fn is_ready(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_at
        }

        fn encode(&self, _: &str, _: &RenderOptions) -> Result<RgbaImage, EncodeError> {
            Err(EncodeError::Backend("unused".into()))
        }
    }

    #[test]
    fn test_qrcode_encoder_fills_requested_size() {
        let opts = RenderOptions::ticket();
        let img = QrcodeEncoder.encode("QR_SHANCHI_001_EA", &opts).unwrap();
        assert_eq!(img.dimensions(), (200, 200));
        assert!(img.pixels().any(|p| *p == opts.dark));
        assert_eq!(*img.get_pixel(0, 0), opts.light);
    }

    #[test]
    fn test_qrcode_encoder_rejects_tiny_raster() {
        let opts = RenderOptions {
            width: 10,
            height: 10,
            ec_level: ECLevel::H,
            ..RenderOptions::default()
        };
        assert!(matches!(
            QrcodeEncoder.encode("QR_SHANCHI_001_EA", &opts),
            Err(EncodeError::Backend(_))
        ));
    }

    #[test]
    fn test_wait_until_ready_polls() {
        let enc = ReadyAfter {
            polls: AtomicUsize::new(0),
            ready_at: 3,
        };
        wait_until_ready(&enc, Duration::from_secs(1), Duration::from_millis(1)).unwrap();
        assert_eq!(enc.polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_wait_until_ready_times_out() {
        let enc = ReadyAfter {
            polls: AtomicUsize::new(0),
            ready_at: usize::MAX,
        };
        let err = wait_until_ready(&enc, Duration::from_millis(20), Duration::from_millis(5))
            .unwrap_err();
        assert!(matches!(err, EncodeError::LibraryUnavailable(_)));
    }
}
