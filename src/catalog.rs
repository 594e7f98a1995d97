//! Event catalog and ticket store collaborators.

use crate::error::CatalogError;
use crate::models::{EventRecord, TicketRecord};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::info;

/// Lookup of events by id
pub trait EventCatalog {
    fn event_by_id(&self, event_id: &str) -> Option<&EventRecord>;

    fn all_events(&self) -> Vec<&EventRecord>;
}

/// In-memory catalog, seeded with the default events or loaded from JSON
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    events: BTreeMap<String, EventRecord>,
}

impl StaticCatalog {
    pub fn new(events: impl IntoIterator<Item = EventRecord>) -> Self {
        Self {
            events: events.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    /// Load a JSON array of events. An empty array is rejected in favour of
    /// the defaults by [`load_or_default`](Self::load_or_default).
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let events: Vec<EventRecord> = serde_json::from_str(&raw)?;
        Ok(Self::new(events))
    }

    /// Use `path` when given and it yields at least one event, otherwise the
    /// built-in seed
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CatalogError> {
        if let Some(path) = path {
            let catalog = Self::from_path(path)?;
            if !catalog.events.is_empty() {
                info!(path = %path.display(), events = catalog.events.len(), "loaded event catalog");
                return Ok(catalog);
            }
        }
        Ok(Self::default())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(default_events())
    }
}

impl EventCatalog for StaticCatalog {
    fn event_by_id(&self, event_id: &str) -> Option<&EventRecord> {
        self.events.get(event_id)
    }

    fn all_events(&self) -> Vec<&EventRecord> {
        self.events.values().collect()
    }
}

fn event(id: u32, title: &str, date: &str, price: f64, image: &str, description: &str, features: [&str; 4]) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        location: "Newcastle, UK".to_string(),
        price,
        image: format!("https://images.unsplash.com/{image}"),
        description: description.to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}

/// The built-in event seed
pub fn default_events() -> Vec<EventRecord> {
    vec![
        event(
            1,
            "Shang-Chi",
            "3 March 2025",
            25.0,
            "photo-1493225457124-a3eb161ffa5f",
            "Experience an incredible martial arts and action-packed entertainment event featuring live performances, interactive experiences, and multi-genre entertainment.",
            ["Live Action Performances", "Interactive Experiences", "Multi-Genre Entertainment", "Food & Beverages"],
        ),
        event(
            2,
            "Yellow Buses",
            "8 April 2025",
            30.0,
            "photo-1558618047-3c8c76ca7d13",
            "A unique urban adventure featuring live music, street performances, and an unforgettable journey through the city with our signature yellow bus experience.",
            ["Live Music", "Street Performances", "Urban Adventure", "Signature Transportation"],
        ),
        event(
            3,
            "An Events' Event",
            "11 April 2025",
            35.0,
            "photo-1574391884720-bbc2f77f9086",
            "The ultimate meta-entertainment experience where events become the entertainment. Interactive performances, live music, and immersive experiences.",
            ["Meta Entertainment", "Interactive Shows", "Live Music", "Immersive Experiences"],
        ),
        event(
            4,
            "Bend Pot",
            "4 March 2024",
            28.0,
            "photo-1506905925346-21bda4d32df4",
            "Octopuses humming. The sub did not explode, and the fireworks may have been a tactical mistake. The mood is electric.",
            ["Maritime Theme", "Nautical Experiences", "Live Performances", "Oceanic Adventures"],
        ),
        event(
            5,
            "City Lights",
            "15 May 2025",
            32.0,
            "photo-1513475382585-d06e58bcb0e0",
            "Illuminate your night with urban entertainment, rooftop performances, and city-wide experiences that showcase the best of Newcastle nightlife.",
            ["Urban Entertainment", "Rooftop Performances", "City Experiences", "Nightlife Showcase"],
        ),
        event(
            6,
            "Stadium Nights",
            "22 June 2025",
            40.0,
            "photo-1517263904808-5dc91e3e7044",
            "Experience the energy of stadium-scale entertainment with live music, sports entertainment, and massive crowd participation events.",
            ["Stadium Scale", "Live Music", "Sports Entertainment", "Crowd Participation"],
        ),
    ]
}

/// Which of a user's tickets to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketFilter {
    #[default]
    All,
    /// Event date today or later
    Upcoming,
    /// Event date before now
    Past,
}

impl TicketFilter {
    /// Tickets whose event date cannot be parsed match only [`TicketFilter::All`]
    pub fn matches(&self, ticket: &TicketRecord, now: DateTime<Utc>) -> bool {
        if *self == TicketFilter::All {
            return true;
        }
        let Some(date) = parse_event_date(&ticket.event_date) else {
            return false;
        };
        let upcoming = date >= now.date_naive();
        match self {
            TicketFilter::Upcoming => upcoming,
            TicketFilter::Past => !upcoming,
            TicketFilter::All => true,
        }
    }
}

/// Parse "3 March 2025", "2025-03-03" or an RFC 3339 timestamp
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d %B %Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

/// Source of the tickets a user owns
pub trait TicketStore {
    fn user_tickets(&self, user_id: &str) -> Vec<TicketRecord>;

    fn filtered_tickets(&self, user_id: &str, filter: TicketFilter, now: DateTime<Utc>) -> Vec<TicketRecord> {
        self.user_tickets(user_id)
            .into_iter()
            .filter(|t| filter.matches(t, now))
            .collect()
    }
}

/// Tickets keyed by user id, from JSON (`{"user_001": [ ... ]}`) or the demo set
#[derive(Debug, Clone, Default)]
pub struct JsonTicketStore {
    tickets: HashMap<String, Vec<TicketRecord>>,
}

impl JsonTicketStore {
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        Ok(Self {
            tickets: serde_json::from_str(&raw)?,
        })
    }

    /// The demo user's two confirmed tickets
    pub fn demo() -> Self {
        let ticket = |id: &str, event_id: &str, title: &str, date: &str, kind: &str, quantity, purchased: &str, code: &str| {
            TicketRecord {
                id: id.to_string(),
                event_id: event_id.to_string(),
                event_title: title.to_string(),
                event_date: date.to_string(),
                event_location: "Newcastle, UK".to_string(),
                ticket_type: kind.to_string(),
                quantity,
                price: 80.0,
                purchase_date: purchased.to_string(),
                qr_code: code.to_string(),
                status: "confirmed".to_string(),
            }
        };

        let mut tickets = HashMap::new();
        tickets.insert(
            "user_001".to_string(),
            vec![
                ticket("ticket_001", "1", "Shang-Chi", "3 March 2025", "Early Access", 2, "2024-12-20T10:30:00Z", "QR_SHANCHI_001_EA"),
                ticket("ticket_002", "2", "Bend Pot", "6 March 2024", "VIP Access", 1, "2024-12-19T15:45:00Z", "QR_BENDPOT_002_VIP"),
            ],
        );
        Self { tickets }
    }

    /// Find one ticket of `user_id` by ticket id or code id
    pub fn find(&self, user_id: &str, id_or_code: &str) -> Option<&TicketRecord> {
        self.tickets
            .get(user_id)?
            .iter()
            .find(|t| t.id == id_or_code || t.qr_code == id_or_code)
    }
}

impl TicketStore for JsonTicketStore {
    fn user_tickets(&self, user_id: &str) -> Vec<TicketRecord> {
        self.tickets.get(user_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_default_catalog() {
        let catalog = StaticCatalog::default();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.event_by_id("1").map(|e| e.title.as_str()), Some("Shang-Chi"));
        assert!(catalog.event_by_id("999").is_none());
        assert_eq!(catalog.all_events().len(), 6);
    }

    #[test]
    fn test_load_override_and_empty_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 42, "title": "Pop-up"}}]"#).unwrap();
        let catalog = StaticCatalog::load_or_default(Some(file.path())).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.event_by_id("42").is_some());

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "[]").unwrap();
        let catalog = StaticCatalog::load_or_default(Some(empty.path())).unwrap();
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            StaticCatalog::from_path(file.path()),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_parse_event_date() {
        assert_eq!(parse_event_date("3 March 2025"), NaiveDate::from_ymd_opt(2025, 3, 3));
        assert_eq!(parse_event_date("22 June 2025"), NaiveDate::from_ymd_opt(2025, 6, 22));
        assert_eq!(parse_event_date("2025-06-22"), NaiveDate::from_ymd_opt(2025, 6, 22));
        assert!(parse_event_date("someday").is_none());
    }

    #[test]
    fn test_filters() {
        let store = JsonTicketStore::demo();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let upcoming = store.filtered_tickets("user_001", TicketFilter::Upcoming, now);
        let past = store.filtered_tickets("user_001", TicketFilter::Past, now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "ticket_001");
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, "ticket_002");
        assert_eq!(store.filtered_tickets("user_001", TicketFilter::All, now).len(), 2);
        assert!(store.user_tickets("nobody").is_empty());
    }

    #[test]
    fn test_find_by_id_or_code() {
        let store = JsonTicketStore::demo();
        assert!(store.find("user_001", "ticket_002").is_some());
        assert!(store.find("user_001", "QR_SHANCHI_001_EA").is_some());
        assert!(store.find("user_002", "ticket_001").is_none());
    }
}
