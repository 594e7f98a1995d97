use super::{Camera, FrameDecoder, Scanner};
use crate::catalog::EventCatalog;
use crate::error::ScanError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Drives [`Scanner::tick`] at a fixed interval on a worker thread.
///
/// [`stop`](ScanLoop::stop) joins the worker, so no tick runs after it
/// returns.
pub struct ScanLoop<C, D, K> {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicUsize>,
    handle: Option<JoinHandle<Scanner<C, D, K>>>,
}

impl<C, D, K> ScanLoop<C, D, K>
where
    C: Camera + 'static,
    D: FrameDecoder + 'static,
    K: EventCatalog + Send + 'static,
{
    /// Start `scanner` (if idle) and begin ticking every `interval`
    pub fn spawn(mut scanner: Scanner<C, D, K>, interval: Duration) -> Result<Self, ScanError> {
        scanner.start()?;

        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&running);
        let counter = Arc::clone(&ticks);

        let handle = thread::Builder::new()
            .name("ticket-scan".into())
            .spawn(move || {
                let mut next = Instant::now();
                while flag.load(Ordering::Acquire) {
                    scanner.tick();
                    counter.fetch_add(1, Ordering::Relaxed);

                    next += interval;
                    // Sleep in slices, rechecking the flag
                    while flag.load(Ordering::Acquire) {
                        let now = Instant::now();
                        if now >= next {
                            break;
                        }
                        thread::sleep((next - now).min(Duration::from_millis(10)));
                    }
                }
                scanner.stop();
                scanner
            })
            .map_err(|e| ScanError::FrameProcessing(format!("failed to spawn scan thread: {e}")))?;

        debug!(interval_ms = interval.as_millis() as u64, "scan loop started");
        Ok(Self {
            running,
            ticks,
            handle: Some(handle),
        })
    }

    /// Ticks processed so far
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::Relaxed)
    }

    /// False once stopping was requested or the worker has exited
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking, release the camera and hand the idle scanner back.
    ///
    /// Returns `None` when the worker panicked.
    pub fn stop(mut self) -> Option<Scanner<C, D, K>> {
        self.running.store(false, Ordering::Release);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(scanner) => {
                debug!(ticks = self.ticks(), "scan loop stopped");
                Some(scanner)
            }
            Err(_) => {
                error!("scan thread panicked");
                None
            }
        }
    }
}

impl<C, D, K> Drop for ScanLoop<C, D, K> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::models::{BitMatrix, TicketPayload};
    use crate::scanner::{ImageSequenceCamera, ScanResult, Validator};
    use chrono::Utc;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    struct EveryFrame(String);

    impl FrameDecoder for EveryFrame {
        fn decode(&mut self, _: &BitMatrix) -> Option<String> {
            Some(self.0.clone())
        }
    }

    struct Crashes;

    impl FrameDecoder for Crashes {
        fn decode(&mut self, _: &BitMatrix) -> Option<String> {
            panic!("decoder crashed");
        }
    }

    fn camera() -> ImageSequenceCamera {
        ImageSequenceCamera::new(vec![RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 255]))])
    }

    #[test]
    fn test_loop_ticks_and_stops() {
        let text = TicketPayload::demo(Utc::now()).to_canonical_string().unwrap();
        let results: Arc<Mutex<Vec<ScanResult>>> = Arc::default();
        let sink = Arc::clone(&results);

        let mut scanner = Scanner::new(camera(), EveryFrame(text), Validator::new(StaticCatalog::default()));
        scanner.on_result(move |r| sink.lock().unwrap().push(r.clone()));

        let session = ScanLoop::spawn(scanner, Duration::from_millis(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.ticks() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let scanner = session.stop().unwrap();
        assert!(!scanner.is_scanning());

        let count = results.lock().unwrap().len();
        assert!(count >= 3);
        assert!(results.lock().unwrap().iter().all(|r| r.success));

        // No tick fires after stop returned
        thread::sleep(Duration::from_millis(30));
        assert_eq!(results.lock().unwrap().len(), count);
    }

    #[test]
    fn test_spawn_fails_without_camera() {
        let scanner = Scanner::new(
            ImageSequenceCamera::new(Vec::new()),
            EveryFrame(String::new()),
            Validator::new(StaticCatalog::default()),
        );
        assert!(matches!(
            ScanLoop::spawn(scanner, Duration::from_millis(5)),
            Err(ScanError::CameraAccess(_))
        ));
    }

    #[test]
    fn test_worker_panic_ends_the_loop() {
        let scanner = Scanner::new(camera(), Crashes, Validator::new(StaticCatalog::default()));
        let session = ScanLoop::spawn(scanner, Duration::from_millis(5)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!session.is_running());
        assert_eq!(session.ticks(), 0);
        assert!(session.stop().is_none());
    }
}
