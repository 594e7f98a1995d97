//! Admin-side ticket scanning
//!
//! A [`Scanner`] owns the camera stream, the frame decoder and the validator.
//! Each [`tick`](Scanner::tick) captures one frame, binarizes it, asks the
//! decoder for text and turns any text into a [`ScanResult`]. A
//! [`ScanLoop`] drives ticks on a worker thread.
//!
//! ```text
//! Idle --start--> Scanning --tick--> (result | nothing) --stop--> Idle
//! ```

/// Camera seam and a frame-sequence camera
pub mod camera;
/// Frame decoders
pub mod decode;
/// Background tick loop
pub mod session;
/// Payload admission rules
pub mod validate;

pub use camera::{Camera, CameraConstraints, CameraStream, FacingMode, ImageSequenceCamera};
pub use decode::{FinderGate, FrameDecoder, SimulatedDecoder};
pub use session::ScanLoop;
pub use validate::{ValidationPolicy, Validator};

use crate::catalog::EventCatalog;
use crate::detector::binarize_frame;
use crate::error::ScanError;
use crate::models::TicketPayload;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Scanner lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Outcome of handling one decoded code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketPayload>,
    pub message: String,
}

impl ScanResult {
    fn format_error() -> Self {
        Self {
            success: false,
            ticket: None,
            message: "Invalid QR code format".to_string(),
        }
    }
}

type ResultCallback = Box<dyn FnMut(&ScanResult) + Send>;

/// Camera-backed ticket scanner.
///
/// Holds a camera stream only while scanning; each [`tick`](Scanner::tick)
/// captures one frame, decodes it and reports the validated result.
pub struct Scanner<C, D, K> {
    camera: C,
    decoder: D,
    validator: Validator<K>,
    constraints: CameraConstraints,
    stream: Option<Box<dyn CameraStream>>,
    frame_size: Option<(u32, u32)>,
    on_result: Option<ResultCallback>,
}

impl<C: Camera, D: FrameDecoder, K: EventCatalog> Scanner<C, D, K> {
    pub fn new(camera: C, decoder: D, validator: Validator<K>) -> Self {
        Self {
            camera,
            decoder,
            validator,
            constraints: CameraConstraints::default(),
            stream: None,
            frame_size: None,
            on_result: None,
        }
    }

    pub fn with_constraints(mut self, constraints: CameraConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Register the callback every [`ScanResult`] is delivered to
    pub fn on_result(&mut self, callback: impl FnMut(&ScanResult) + Send + 'static) {
        self.on_result = Some(Box::new(callback));
    }

    pub fn state(&self) -> ScanState {
        if self.stream.is_some() {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Size of the frames the open stream delivers
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_size
    }

    pub fn validator(&self) -> &Validator<K> {
        &self.validator
    }

    /// Open the camera and wait for its first metadata. No-op while scanning.
    ///
    /// On failure nothing is held open and the scanner stays idle.
    pub fn start(&mut self) -> Result<(), ScanError> {
        if self.is_scanning() {
            return Ok(());
        }

        let mut stream = self.camera.open(&self.constraints).map_err(|e| {
            error!(error = %e, "error accessing camera");
            into_camera_access(e)
        })?;
        let size = match stream.wait_ready() {
            Ok(size) => size,
            Err(e) => {
                stream.stop();
                error!(error = %e, "camera never became ready");
                return Err(into_camera_access(e));
            }
        };

        info!(width = size.0, height = size.1, "scanning started");
        self.frame_size = Some(size);
        self.stream = Some(stream);
        Ok(())
    }

    /// Release the stream. Safe to call when idle.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            self.frame_size = None;
            info!("scanning stopped");
        }
    }

    /// Process one frame. Frame errors are logged and yield no result.
    pub fn tick(&mut self) -> Option<ScanResult> {
        let stream = self.stream.as_mut()?;
        let frame = match stream.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "error during QR scanning");
                return None;
            }
        };
        if frame.width() == 0 || frame.height() == 0 {
            warn!("error during QR scanning: empty frame");
            return None;
        }

        let binary = binarize_frame(&frame);
        let text = self.decoder.decode(&binary)?;
        Some(self.handle_detection(&text))
    }

    /// Parse, validate and report a decoded code
    pub fn handle_detection(&mut self, raw: &str) -> ScanResult {
        let result = evaluate(&self.validator, raw);
        info!(success = result.success, message = %result.message, "scan result");
        if let Some(callback) = self.on_result.as_mut() {
            callback(&result);
        }
        result
    }

    /// Manual entry of a scanned code, bypassing the camera
    pub fn submit(&mut self, raw: &str) -> ScanResult {
        self.handle_detection(raw)
    }

    /// Run the demo ticket through the same path as a real detection
    pub fn test_with_demo_ticket(&mut self) -> ScanResult {
        match TicketPayload::demo(Utc::now()).to_canonical_string() {
            Ok(raw) => self.handle_detection(&raw),
            Err(e) => {
                error!(error = %e, "demo payload serialization failed");
                ScanResult::format_error()
            }
        }
    }
}

/// Turn decoded text into a [`ScanResult`] without touching any scanner state
pub fn evaluate<K: EventCatalog>(validator: &Validator<K>, raw: &str) -> ScanResult {
    match TicketPayload::parse(raw) {
        Err(e) => {
            debug!(error = %e, "decoded text is not a ticket payload");
            ScanResult::format_error()
        }
        Ok(payload) => match validator.validate(&payload) {
            Ok(()) => ScanResult {
                success: true,
                ticket: Some(payload),
                message: "Valid ticket detected".to_string(),
            },
            Err(reason) => ScanResult {
                success: false,
                ticket: Some(payload),
                message: format!("Invalid or expired ticket: {reason}"),
            },
        },
    }
}

impl<C, D, K> Drop for Scanner<C, D, K> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

fn into_camera_access(e: ScanError) -> ScanError {
    match e {
        ScanError::CameraAccess(_) => e,
        other => ScanError::CameraAccess(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::models::BitMatrix;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Counts open streams so tests can assert at most one is ever live
    #[derive(Clone, Default)]
    struct CountingCamera {
        live: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        opens: Arc<AtomicUsize>,
        deny: bool,
        never_ready: bool,
    }

    struct CountingStream {
        live: Arc<AtomicUsize>,
        stopped: bool,
        ready: bool,
    }

    impl Camera for CountingCamera {
        fn open(&mut self, _: &CameraConstraints) -> Result<Box<dyn CameraStream>, ScanError> {
            if self.deny {
                return Err(ScanError::CameraAccess("permission denied".into()));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            Ok(Box::new(CountingStream {
                live: Arc::clone(&self.live),
                stopped: false,
                ready: !self.never_ready,
            }))
        }
    }

    impl CameraStream for CountingStream {
        fn wait_ready(&mut self) -> Result<(u32, u32), ScanError> {
            if self.ready {
                Ok((640, 480))
            } else {
                Err(ScanError::FrameProcessing("no metadata".into()))
            }
        }

        fn capture(&mut self) -> Result<RgbaImage, ScanError> {
            Ok(RgbaImage::from_pixel(64, 48, Rgba([255, 255, 255, 255])))
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    struct Scripted(Vec<Option<String>>);

    impl FrameDecoder for Scripted {
        fn decode(&mut self, _: &BitMatrix) -> Option<String> {
            if self.0.is_empty() { None } else { self.0.remove(0) }
        }
    }

    fn scanner(camera: CountingCamera, script: Vec<Option<String>>) -> Scanner<CountingCamera, Scripted, StaticCatalog> {
        Scanner::new(camera, Scripted(script), Validator::new(StaticCatalog::default()))
    }

    fn demo_text() -> String {
        TicketPayload::demo(Utc::now()).to_canonical_string().unwrap()
    }

    #[test]
    fn test_start_stop_never_holds_two_streams() {
        let camera = CountingCamera::default();
        let mut s = scanner(camera.clone(), Vec::new());

        s.start().unwrap();
        s.start().unwrap();
        assert_eq!(camera.opens.load(Ordering::SeqCst), 1);
        s.stop();
        s.start().unwrap();
        s.stop();
        s.stop();

        assert_eq!(camera.peak.load(Ordering::SeqCst), 1);
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);
        assert_eq!(s.state(), ScanState::Idle);
    }

    #[test]
    fn test_camera_denied_stays_idle() {
        let camera = CountingCamera {
            deny: true,
            ..CountingCamera::default()
        };
        let mut s = scanner(camera.clone(), Vec::new());
        assert!(matches!(s.start(), Err(ScanError::CameraAccess(_))));
        assert_eq!(s.state(), ScanState::Idle);
        assert!(s.tick().is_none());
    }

    #[test]
    fn test_metadata_failure_releases_stream() {
        let camera = CountingCamera {
            never_ready: true,
            ..CountingCamera::default()
        };
        let mut s = scanner(camera.clone(), Vec::new());
        assert!(matches!(s.start(), Err(ScanError::CameraAccess(_))));
        assert_eq!(s.state(), ScanState::Idle);
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_releases_stream() {
        let camera = CountingCamera::default();
        {
            let mut s = scanner(camera.clone(), Vec::new());
            s.start().unwrap();
            assert_eq!(s.frame_size(), Some((640, 480)));
        }
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tick_reports_detections() {
        let camera = CountingCamera::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut s = scanner(camera, vec![None, Some(demo_text()), Some("not json".into())]);
        let sink = Arc::clone(&seen);
        s.on_result(move |r| sink.lock().unwrap().push(r.clone()));

        assert!(s.tick().is_none(), "idle scanner must not tick");
        s.start().unwrap();
        assert!(s.tick().is_none());

        let valid = s.tick().unwrap();
        assert!(valid.success);
        assert_eq!(valid.message, "Valid ticket detected");

        let garbage = s.tick().unwrap();
        assert!(!garbage.success);
        assert_eq!(garbage.message, "Invalid QR code format");
        assert!(garbage.ticket.is_none());

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_ticket_message() {
        let mut s = scanner(CountingCamera::default(), Vec::new());
        let mut payload = TicketPayload::demo(Utc::now());
        payload.event_id = "999".into();
        let result = s.submit(&payload.to_canonical_string().unwrap());
        assert!(!result.success);
        assert_eq!(result.message, "Invalid or expired ticket: unknown event '999'");
        assert_eq!(result.ticket.map(|t| t.event_id).as_deref(), Some("999"));
    }

    #[test]
    fn test_demo_ticket_is_valid() {
        let mut s = scanner(CountingCamera::default(), Vec::new());
        let result = s.test_with_demo_ticket();
        assert!(result.success);
        assert_eq!(result.ticket.unwrap().ticket_id, "ticket_001");
    }

    #[test]
    fn test_result_serializes_like_wire_shape() {
        let json = serde_json::to_value(ScanResult::format_error()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid QR code format");
        assert!(json.get("ticket").is_none());
    }
}
