use std::time::Duration;
use thiserror::Error;

/// Failures while turning a payload into a raster
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Input the builtin pattern generator cannot render
    #[error("cannot encode ticket: {0}")]
    Encoding(String),

    /// The standards encoder never became ready within the wait budget
    #[error("QR encoder unavailable after {0:?}")]
    LibraryUnavailable(Duration),

    /// The standards encoder rejected the data
    #[error("QR encoder failed: {0}")]
    Backend(String),

    /// The payload could not be written as JSON
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while compositing or exporting a ticket image
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("share failed: {0}")]
    Share(String),
}

/// Failures on the scanning side
#[derive(Error, Debug)]
pub enum ScanError {
    /// Permission denied or no usable device; scanning never starts
    #[error("Camera access denied or not available: {0}")]
    CameraAccess(String),

    /// A single tick failed; the loop keeps running
    #[error("frame processing failed: {0}")]
    FrameProcessing(String),

    /// Decoded text is not a JSON payload
    #[error("Invalid QR code format: {0}")]
    PayloadFormat(#[from] serde_json::Error),
}

/// Reason a well-formed payload is not admissible
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("not issued by this system (system '{0}')")]
    WrongSystem(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("ticket timestamp is missing or too old")]
    Stale,

    #[error("ticket '{0}' was already redeemed")]
    AlreadyRedeemed(String),
}

/// Failures loading catalog or ticket-store data
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
