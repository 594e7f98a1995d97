use crate::detector::FinderDetector;
use crate::models::{BitMatrix, TicketPayload};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Turns a binarized frame into the text of a code, if one is readable
pub trait FrameDecoder: Send {
    fn decode(&mut self, frame: &BitMatrix) -> Option<String>;
}

/// Stands in for a real decoder: reports the demo ticket with a fixed
/// probability per frame, regardless of frame content
#[derive(Debug)]
pub struct SimulatedDecoder {
    rng: StdRng,
    rate: f64,
}

impl SimulatedDecoder {
    pub fn new(rate: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            rate: rate.clamp(0.0, 1.0),
        }
    }

    /// Reproducible detections for tests and replays
    pub fn seeded(rate: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rate: rate.clamp(0.0, 1.0),
        }
    }
}

impl FrameDecoder for SimulatedDecoder {
    fn decode(&mut self, _frame: &BitMatrix) -> Option<String> {
        if !self.rng.gen_bool(self.rate) {
            return None;
        }
        debug!("simulated detection");
        TicketPayload::demo(Utc::now()).to_canonical_string().ok()
    }
}

/// Only consults `inner` when the frame shows at least three finder markers
#[derive(Debug)]
pub struct FinderGate<D> {
    inner: D,
}

impl<D: FrameDecoder> FinderGate<D> {
    pub const MIN_FINDERS: usize = 3;

    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: FrameDecoder> FrameDecoder for FinderGate<D> {
    fn decode(&mut self, frame: &BitMatrix) -> Option<String> {
        let finders = FinderDetector::detect(frame).len();
        trace!(finders, "finder gate");
        if finders < Self::MIN_FINDERS {
            return None;
        }
        self.inner.decode(frame)
    }
}
