use crate::models::wire::string_or_number;
use serde::{Deserialize, Serialize};

/// An event in the catalog, as supplied for compositing and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Catalog id; numeric ids in imported JSON are accepted and stringified
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// The subset of event data drawn onto a ticket image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMeta {
    pub title: String,
    pub date: String,
    pub location: String,
}

impl From<&EventRecord> for EventMeta {
    fn from(event: &EventRecord) -> Self {
        Self {
            title: event.title.clone(),
            date: event.date.clone(),
            location: event.location.clone(),
        }
    }
}
