//! ticket_qr - QR tickets for Blankrooms events
//!
//! Covers the lifecycle of a ticket's code:
//! - encoding a ticket payload into a code raster (standards QR, or a
//!   deterministic builtin pattern when no encoder is available)
//! - compositing that raster into a shareable 600x800 ticket image
//! - scanning frames at the door and validating the decoded payload
//!
//! Services are plain values: build a [`TicketCodeGenerator`], a
//! [`Validator`] and a [`Scanner`] once and pass them where needed.

/// Event catalog and ticket store
pub mod catalog;
/// Settings read from the environment
pub mod config;
/// Ticket image layout and export
pub mod compositor;
/// Finder marker localisation in frames
pub mod detector;
/// Payload to raster encoding
pub mod encoder;
/// Error types
pub mod error;
/// Core data structures (payloads, events, bit matrices, render options)
pub mod models;
/// Camera, decoder, validator and the scan state machine
pub mod scanner;
/// Frame loading and image statistics
pub mod tools;
/// Grayscale, binarization and hashing helpers
pub mod utils;

pub use catalog::{EventCatalog, JsonTicketStore, StaticCatalog, TicketFilter, TicketStore};
pub use compositor::{ExportOutcome, TicketExporter, TicketImage, compose};
pub use config::Settings;
pub use encoder::{EncodedRaster, EncodedTicket, RasterSource, TicketCodeGenerator};
pub use error::{CatalogError, ComposeError, EncodeError, ScanError, ValidationFailure};
pub use models::{EventMeta, EventRecord, RenderOptions, TicketPayload, TicketRecord};
pub use scanner::{ScanLoop, ScanResult, ScanState, Scanner, ValidationPolicy, Validator};
