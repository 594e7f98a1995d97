pub mod event;
pub mod matrix;
pub mod options;
pub mod payload;
pub mod point;
pub mod wire;

pub use event::{EventMeta, EventRecord};
pub use matrix::BitMatrix;
pub use options::{ECLevel, RenderOptions};
pub use payload::{PAYLOAD_VERSION, SYSTEM_TAG, TicketPayload, TicketRecord, signature_for};
pub use point::Point;
