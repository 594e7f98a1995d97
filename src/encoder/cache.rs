use super::EncodedTicket;
use std::collections::HashMap;

/// Session-scoped store of encoded tickets, keyed by code id (or ticket id).
///
/// Entries are never invalidated; the cache lives as long as its owner.
#[derive(Debug, Default)]
pub struct RasterCache {
    entries: HashMap<String, EncodedTicket>,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&EncodedTicket> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert unless an entry already exists; the first encoding wins
    pub fn insert(&mut self, key: &str, ticket: EncodedTicket) -> &EncodedTicket {
        self.entries.entry(key.to_string()).or_insert(ticket)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
