//! Ticket code encoding
//!
//! This module turns ticket payloads into rasters:
//! - Standards QR encoding through a [`SymbolEncoder`] when one is available
//! - A deterministic synthetic pattern when it is not (or when it fails)
//! - A session cache and parallel prewarming of a user's tickets

/// Standards encoder seam and readiness polling
pub mod backend;
/// Per-session cache of encoded tickets
pub mod cache;
/// Deterministic fallback pattern generator
pub mod pattern;

pub use backend::{QrcodeEncoder, SymbolEncoder, wait_until_ready};
pub use cache::RasterCache;

use crate::config::Settings;
use crate::error::EncodeError;
use crate::models::{RenderOptions, TicketPayload, TicketRecord};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which path produced a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterSource {
    /// Standards QR code, machine readable
    Standard,
    /// Builtin synthetic pattern, visual placeholder only
    Synthetic,
}

/// An encoded code image
#[derive(Debug, Clone)]
pub struct EncodedRaster {
    pub image: RgbaImage,
    pub source: RasterSource,
}

/// A raster together with the exact payload it encodes
#[derive(Debug, Clone)]
pub struct EncodedTicket {
    pub raster: Arc<EncodedRaster>,
    pub payload: TicketPayload,
}

/// Outcome of [`TicketCodeGenerator::prewarm`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrewarmReport {
    /// Tickets encoded and inserted by this call
    pub encoded: usize,
    /// Tickets already present in the cache
    pub cached: usize,
    /// Tickets that failed to encode
    pub failed: usize,
}

/// Encodes ticket codes, preferring a standards encoder and falling back to
/// the builtin pattern.
pub struct TicketCodeGenerator {
    encoder: Option<Arc<dyn SymbolEncoder>>,
    cache: RasterCache,
}

impl TicketCodeGenerator {
    /// Generator backed by the `qrcode` crate
    pub fn new(settings: &Settings) -> Self {
        Self::with_encoder(QrcodeEncoder, settings)
    }

    /// Generator backed by `encoder`, waiting up to `settings.library_timeout`
    /// for it to become ready. An encoder that never does is dropped and the
    /// builtin pattern is used for the generator's lifetime.
    pub fn with_encoder<E: SymbolEncoder + 'static>(encoder: E, settings: &Settings) -> Self {
        match wait_until_ready(&encoder, settings.library_timeout, settings.library_poll) {
            Ok(()) => {
                info!("QR code: external encoder ready");
                Self {
                    encoder: Some(Arc::new(encoder)),
                    cache: RasterCache::new(),
                }
            }
            Err(err) => {
                warn!(error = %err, "external QR encoder failed, using built-in generator");
                Self::builtin()
            }
        }
    }

    /// Generator that only ever draws the synthetic pattern
    pub fn builtin() -> Self {
        Self {
            encoder: None,
            cache: RasterCache::new(),
        }
    }

    pub fn uses_standard_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    pub fn cache(&self) -> &RasterCache {
        &self.cache
    }

    /// Encode arbitrary text. Errors from the standards encoder are logged
    /// and answered with the synthetic pattern.
    pub fn generate(&self, data: &str, options: &RenderOptions) -> Result<EncodedRaster, EncodeError> {
        if let Some(encoder) = &self.encoder {
            match encoder.encode(data, options) {
                Ok(image) => {
                    return Ok(EncodedRaster {
                        image,
                        source: RasterSource::Standard,
                    });
                }
                Err(err) => warn!(error = %err, "external QR generation failed, falling back"),
            }
        }

        let image = pattern::render_pattern(data, options)?;
        Ok(EncodedRaster {
            image,
            source: RasterSource::Synthetic,
        })
    }

    /// Encode an already-built payload
    pub fn encode_payload(
        &self,
        payload: &TicketPayload,
        options: &RenderOptions,
    ) -> Result<EncodedRaster, EncodeError> {
        let data = payload.to_canonical_string()?;
        self.generate(&data, options)
    }

    /// Issue a fresh payload for `record` and encode it with ticket options
    pub fn encode_ticket(&self, record: &TicketRecord, user_id: &str) -> Result<EncodedTicket, EncodeError> {
        self.encode_ticket_at(record, user_id, Utc::now())
    }

    /// As [`encode_ticket`](Self::encode_ticket) with an explicit issue time
    pub fn encode_ticket_at(
        &self,
        record: &TicketRecord,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<EncodedTicket, EncodeError> {
        if record.quantity == 0 {
            return Err(EncodeError::Encoding(format!(
                "ticket '{}' has quantity 0",
                record.id
            )));
        }

        let payload = TicketPayload::issue(record, user_id, issued_at);
        let raster = self.encode_payload(&payload, &RenderOptions::ticket())?;
        debug!(
            ticket_id = %record.id,
            source = ?raster.source,
            "encoded ticket"
        );
        Ok(EncodedTicket {
            raster: Arc::new(raster),
            payload,
        })
    }

    /// Encode through the session cache; repeated views of one ticket reuse
    /// the first encoding.
    pub fn encode_ticket_cached(
        &mut self,
        record: &TicketRecord,
        user_id: &str,
    ) -> Result<EncodedTicket, EncodeError> {
        let key = record.cache_key();
        if let Some(hit) = self.cache.get(key) {
            debug!(key, "QR cache hit");
            return Ok(hit.clone());
        }

        let encoded = self.encode_ticket(record, user_id)?;
        Ok(self.cache.insert(key, encoded).clone())
    }

    /// Encode every uncached ticket in parallel and fill the cache.
    ///
    /// Failures are logged and counted; they never abort the batch.
    pub fn prewarm(&mut self, records: &[TicketRecord], user_id: &str) -> PrewarmReport {
        let mut report = PrewarmReport::default();
        let mut pending: Vec<&TicketRecord> = Vec::new();
        for record in records {
            let key = record.cache_key();
            if self.cache.contains(key) || pending.iter().any(|r| r.cache_key() == key) {
                report.cached += 1;
            } else {
                pending.push(record);
            }
        }

        let issued_at = Utc::now();
        let this = &*self;
        let results: Vec<(&TicketRecord, Result<EncodedTicket, EncodeError>)> = pending
            .par_iter()
            .map(|record| (*record, this.encode_ticket_at(record, user_id, issued_at)))
            .collect();

        for (record, result) in results {
            match result {
                Ok(encoded) => {
                    self.cache.insert(record.cache_key(), encoded);
                    report.encoded += 1;
                }
                Err(err) => {
                    warn!(key = record.cache_key(), error = %err, "prewarm QR failed");
                    report.failed += 1;
                }
            }
        }

        debug!(?report, "prewarm finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct NeverReady;

    impl SymbolEncoder for NeverReady {
        fn is_ready(&self) -> bool {
            false
        }

        fn encode(&self, _: &str, _: &RenderOptions) -> Result<RgbaImage, EncodeError> {
            unreachable!("never ready")
        }
    }

    struct AlwaysFails;

    impl SymbolEncoder for AlwaysFails {
        fn encode(&self, _: &str, _: &RenderOptions) -> Result<RgbaImage, EncodeError> {
            Err(EncodeError::Backend("boom".into()))
        }
    }

    fn fast_settings() -> Settings {
        Settings {
            library_timeout: Duration::from_millis(20),
            library_poll: Duration::from_millis(5),
            ..Settings::default()
        }
    }

    fn record(id: &str, code: &str) -> TicketRecord {
        TicketRecord {
            id: id.into(),
            event_id: "1".into(),
            event_title: "Shang-Chi".into(),
            event_date: "3 March 2025".into(),
            event_location: "Newcastle, UK".into(),
            ticket_type: "Early Access".into(),
            quantity: 2,
            price: 80.0,
            purchase_date: String::new(),
            qr_code: code.into(),
            status: "confirmed".into(),
        }
    }

    #[test]
    fn test_unavailable_encoder_falls_back_to_builtin() {
        let generator = TicketCodeGenerator::with_encoder(NeverReady, &fast_settings());
        assert!(!generator.uses_standard_encoder());
        let encoded = generator.encode_ticket(&record("t1", "QR_1"), "user_001").unwrap();
        assert_eq!(encoded.raster.source, RasterSource::Synthetic);
    }

    #[test]
    fn test_failing_encoder_falls_back_per_call() {
        let generator = TicketCodeGenerator::with_encoder(AlwaysFails, &fast_settings());
        assert!(generator.uses_standard_encoder());
        let raster = generator.generate("hello", &RenderOptions::default()).unwrap();
        assert_eq!(raster.source, RasterSource::Synthetic);
    }

    #[test]
    fn test_standard_path() {
        let generator = TicketCodeGenerator::new(&fast_settings());
        let encoded = generator.encode_ticket(&record("t1", "QR_1"), "user_001").unwrap();
        assert_eq!(encoded.raster.source, RasterSource::Standard);
        assert_eq!(encoded.raster.image.dimensions(), (200, 200));
        assert_eq!(encoded.payload.signature, encoded.payload.expected_signature());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut r = record("t1", "QR_1");
        r.quantity = 0;
        assert!(matches!(
            TicketCodeGenerator::builtin().encode_ticket(&r, "u"),
            Err(EncodeError::Encoding(_))
        ));
    }

    #[test]
    fn test_cache_reuses_first_encoding() {
        let mut generator = TicketCodeGenerator::builtin();
        let r = record("t1", "QR_1");
        let first = generator.encode_ticket_cached(&r, "user_001").unwrap();
        let second = generator.encode_ticket_cached(&r, "user_001").unwrap();
        assert!(Arc::ptr_eq(&first.raster, &second.raster));
        assert_eq!(first.payload, second.payload);
        assert_eq!(generator.cache().len(), 1);
    }

    #[test]
    fn test_prewarm_fills_cache_once() {
        let mut generator = TicketCodeGenerator::builtin();
        let records = vec![record("t1", "QR_1"), record("t2", "QR_2"), record("t3", "")];
        let report = generator.prewarm(&records, "user_001");
        assert_eq!(report.encoded, 3);
        assert_eq!(report.failed, 0);
        assert!(generator.cache().contains("t3"));

        let again = generator.prewarm(&records, "user_001");
        assert_eq!(again.encoded, 0);
        assert_eq!(again.cached, 3);
    }

    #[test]
    fn test_prewarm_counts_failures() {
        let mut generator = TicketCodeGenerator::builtin();
        let mut bad = record("t9", "QR_9");
        bad.quantity = 0;
        let report = generator.prewarm(&[record("t1", "QR_1"), bad], "u");
        assert_eq!(report.encoded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(generator.cache().len(), 1);
    }
}
