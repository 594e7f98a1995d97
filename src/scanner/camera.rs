use crate::error::ScanError;
use crate::tools::{collect_images, load_rgba};
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    User,
    #[default]
    Environment,
}

/// Constraints passed to [`Camera::open`]; the sizes are hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 640,
            ideal_height: 480,
        }
    }
}

/// A video source that can be opened into a stream
pub trait Camera: Send {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>, ScanError>;
}

/// An open video stream. Dropping it without [`stop`](Self::stop) still has
/// to release the device.
pub trait CameraStream: Send {
    /// Block until frame metadata is known and return the frame size
    fn wait_ready(&mut self) -> Result<(u32, u32), ScanError>;

    /// Grab the current frame
    fn capture(&mut self) -> Result<RgbaImage, ScanError>;

    fn stop(&mut self);
}

/// Replays a fixed list of frames in a loop
#[derive(Debug, Clone)]
pub struct ImageSequenceCamera {
    frames: Arc<Vec<RgbaImage>>,
}

impl ImageSequenceCamera {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        Self {
            frames: Arc::new(frames),
        }
    }

    /// Load every image under `dir`, in sorted path order
    pub fn from_dir(dir: &Path) -> Result<Self, ScanError> {
        let frames = collect_images(dir)
            .iter()
            .map(|path| load_rgba(path).map_err(|e| ScanError::CameraAccess(format!("{}: {e}", path.display()))))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(dir = %dir.display(), frames = frames.len(), "loaded frame sequence");
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Camera for ImageSequenceCamera {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>, ScanError> {
        if self.frames.is_empty() {
            return Err(ScanError::CameraAccess("no frames available".into()));
        }
        debug!(facing = ?constraints.facing, "opening frame sequence");
        Ok(Box::new(SequenceStream {
            frames: Arc::clone(&self.frames),
            next: 0,
            live: true,
        }))
    }
}

struct SequenceStream {
    frames: Arc<Vec<RgbaImage>>,
    next: usize,
    live: bool,
}

impl CameraStream for SequenceStream {
    fn wait_ready(&mut self) -> Result<(u32, u32), ScanError> {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .ok_or_else(|| ScanError::CameraAccess("empty stream".into()))
    }

    fn capture(&mut self) -> Result<RgbaImage, ScanError> {
        if !self.live {
            return Err(ScanError::FrameProcessing("stream stopped".into()));
        }
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next += 1;
        Ok(frame)
    }

    fn stop(&mut self) {
        self.live = false;
    }
}
