//! Liveness resolution over physical entry names
//!
//! For every key, the entry with the highest sequence number is live; equal
//! sequences fall back to append order. Keys are reported in the order of
//! their first physical entry, so output order is stable across updates.
//!
//! A name inside the record namespace that does not parse belongs to no key.
//! It is counted and logged, never resolved, and the next rebuild drops it.

use std::collections::HashMap;

use tracing::warn;

use crate::observability::Event;
use crate::record::{is_record_entry, parse_entry_name};

/// The live entry for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEntry {
    /// Entry name
    pub name: String,
    /// Winning sequence number
    pub seq: u64,
    /// Append position of the winning entry
    pub position: usize,
    /// Append position of the key's first entry
    pub first_position: usize,
    /// Physical entries for this key, winner included
    pub entries: usize,
}

/// Live view of an archive derived from its entry names
#[derive(Debug, Default)]
pub struct Resolution {
    live: HashMap<String, LiveEntry>,
    order: Vec<String>,
    record_entries: usize,
    malformed_entries: usize,
}

impl Resolution {
    /// Resolve `names`, given in append order.
    ///
    /// Names outside the record namespace are ignored. Malformed names inside
    /// it are skipped and counted.
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolution = Self::default();

        for (position, name) in names.into_iter().enumerate() {
            if !is_record_entry(name) {
                continue;
            }
            let Some(parsed) = parse_entry_name(name) else {
                warn!(
                    event = Event::MalformedEntry.as_str(),
                    entry = name,
                    position,
                    "skipping malformed record entry"
                );
                resolution.malformed_entries += 1;
                continue;
            };
            resolution.record_entries += 1;

            match resolution.live.get_mut(&parsed.key) {
                Some(live) => {
                    live.entries += 1;
                    if parsed.seq >= live.seq {
                        live.name = name.to_string();
                        live.seq = parsed.seq;
                        live.position = position;
                    }
                }
                None => {
                    resolution.order.push(parsed.key.clone());
                    resolution.live.insert(
                        parsed.key,
                        LiveEntry {
                            name: name.to_string(),
                            seq: parsed.seq,
                            position,
                            first_position: position,
                            entries: 1,
                        },
                    );
                }
            }
        }

        resolution
    }

    /// Live entry for `key`
    pub fn get(&self, key: &str) -> Option<&LiveEntry> {
        self.live.get(key)
    }

    /// Whether `key` has a live record
    pub fn contains(&self, key: &str) -> bool {
        self.live.contains_key(key)
    }

    /// Sequence number for the next revision of `key`
    pub fn next_seq(&self, key: &str) -> u64 {
        self.live.get(key).map(|l| l.seq + 1).unwrap_or(1)
    }

    /// Live keys in first-appearance order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of live keys
    pub fn live_count(&self) -> usize {
        self.order.len()
    }

    /// Number of physical record entries
    pub fn record_entries(&self) -> usize {
        self.record_entries
    }

    /// Physical record entries superseded by a later revision
    pub fn stale_entries(&self) -> usize {
        self.record_entries - self.live_count()
    }

    /// Entries in the record namespace whose names do not parse
    pub fn malformed_entries(&self) -> usize {
        self.malformed_entries
    }

    /// Entries a rebuild would drop: stale revisions and malformed names
    pub fn reclaimable(&self) -> usize {
        self.stale_entries() + self.malformed_entries
    }
}
