use crate::models::wire::{lenient_count, lenient_timestamp, string_or_number};
use crate::utils::hash::{hash32, to_base36};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag identifying codes issued by this application
pub const SYSTEM_TAG: &str = "BLANKROOMS";

/// Payload schema version written into every issued code
pub const PAYLOAD_VERSION: &str = "1.0";

/// A purchased ticket as held by the ticket store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub id: String,
    pub event_id: String,
    pub event_title: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub event_location: String,
    pub ticket_type: String,
    pub quantity: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub purchase_date: String,
    #[serde(default)]
    pub qr_code: String,
    #[serde(default)]
    pub status: String,
}

impl TicketRecord {
    /// Key under which this ticket's raster is cached: the code id, or the
    /// ticket id when no code id was assigned
    pub fn cache_key(&self) -> &str {
        if self.qr_code.is_empty() {
            &self.id
        } else {
            &self.qr_code
        }
    }
}

/// The structured record carried inside a ticket's code.
///
/// Deserialization is lenient about missing or mistyped fields so that any
/// JSON object reaches validation instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub ticket_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub event_id: String,
    #[serde(default)]
    pub event_title: String,
    #[serde(default)]
    pub ticket_type: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub qr_code: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signature: String,
}

impl TicketPayload {
    /// Build the payload for `record` owned by `user_id`, stamped at `issued_at`
    pub fn issue(record: &TicketRecord, user_id: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            system: SYSTEM_TAG.to_string(),
            version: PAYLOAD_VERSION.to_string(),
            ticket_id: record.id.clone(),
            event_id: record.event_id.clone(),
            event_title: record.event_title.clone(),
            ticket_type: record.ticket_type.clone(),
            quantity: i64::from(record.quantity),
            qr_code: record.qr_code.clone(),
            user_id: user_id.to_string(),
            timestamp: Some(issued_at),
            signature: signature_for(&record.id, &record.event_id, &record.qr_code),
        }
    }

    /// The fixed ticket the reference deployment uses for demo scans
    pub fn demo(issued_at: DateTime<Utc>) -> Self {
        Self {
            system: SYSTEM_TAG.to_string(),
            version: PAYLOAD_VERSION.to_string(),
            ticket_id: "ticket_001".to_string(),
            event_id: "1".to_string(),
            event_title: "Shang-Chi".to_string(),
            ticket_type: "Early Access".to_string(),
            quantity: 2,
            qr_code: "QR_SHANCHI_001_EA".to_string(),
            user_id: "user_001".to_string(),
            timestamp: Some(issued_at),
            signature: "1a2b3c4d".to_string(),
        }
    }

    /// Compact JSON form; this is the string written into the code
    pub fn to_canonical_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a decoded code string
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Recompute the signature from this payload's own identifiers
    pub fn expected_signature(&self) -> String {
        signature_for(&self.ticket_id, &self.event_id, &self.qr_code)
    }
}

/// Tamper-evidence tag: base-36 of `hash32("{ticket}:{event}:{code}")`.
///
/// Not a MAC. Anyone who knows the scheme can forge it.
pub fn signature_for(ticket_id: &str, event_id: &str, qr_code: &str) -> String {
    to_base36(hash32(&format!("{ticket_id}:{event_id}:{qr_code}")) as u64)
}
