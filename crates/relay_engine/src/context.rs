//! Sticky context store.
//!
//! Keeps fields that should follow every later event (browser, page, user,
//! device, ...). Bounded in size, entries expire lazily on the next update.
//!
//! Invariants:
//! - an empty value is never stored, writing one deletes the key
//! - `len() <= max_entries` after every update, least recently updated goes first
//! - no entry older than `ttl` survives the start of an update

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use contracts::{ContextConfig, ObjectMap, Value};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct ContextEntry {
    value: Value,
    updated_at: Instant,
    /// Update sequence, orders eviction
    seq: u64,
}

/// Outcome of one `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextUpdate {
    pub written: usize,
    pub cleared: usize,
    pub expired: usize,
    pub evicted: usize,
}

/// Bounded, TTL-evicted map of sticky fields
#[derive(Debug)]
pub struct ContextStore {
    entries: HashMap<String, ContextEntry>,
    /// seq -> key, oldest update first
    order: BTreeMap<u64, String>,
    next_seq: u64,
    sticky_prefixes: Vec<String>,
    sticky_fields: HashSet<String>,
    max_entries: usize,
    ttl: Duration,
}

impl ContextStore {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            sticky_prefixes: config.sticky_prefixes.clone(),
            sticky_fields: config.sticky_fields.iter().cloned().collect(),
            max_entries: config.max_entries.max(1),
            ttl: config.ttl(),
        }
    }

    /// Whether a key is captured into the context
    pub fn is_sticky(&self, key: &str) -> bool {
        self.sticky_fields.contains(key)
            || self
                .sticky_prefixes
                .iter()
                .any(|prefix| key.starts_with(prefix.as_str()))
    }

    /// Capture sticky fields from an observed object
    pub fn update(&mut self, object: &ObjectMap) -> ContextUpdate {
        self.update_at(object, Instant::now())
    }

    /// Capture sticky fields as of `now`
    pub fn update_at(&mut self, object: &ObjectMap, now: Instant) -> ContextUpdate {
        let mut outcome = ContextUpdate {
            expired: self.evict_expired(now),
            ..ContextUpdate::default()
        };

        for (key, value) in object {
            if !self.is_sticky(key) {
                continue;
            }
            if value.is_empty_value() {
                if self.remove(key) {
                    outcome.cleared += 1;
                    trace!(key = %key, "Context cleared (empty value)");
                }
            } else {
                self.write(key, value.clone(), now);
                outcome.written += 1;
                trace!(key = %key, "Context updated");
            }
        }

        outcome.evicted = self.enforce_bound();

        if outcome.expired > 0 || outcome.evicted > 0 {
            debug!(
                expired = outcome.expired,
                evicted = outcome.evicted,
                entries = self.entries.len(),
                "Context entries evicted"
            );
        }
        outcome
    }

    /// Store contents overlaid by the event's own fields
    ///
    /// Returns the event itself when there is nothing to merge.
    pub fn merge_into<'a>(&self, event: &'a ObjectMap) -> Cow<'a, ObjectMap> {
        if self.entries.is_empty() {
            return Cow::Borrowed(event);
        }

        let mut merged: ObjectMap = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();
        for (key, value) in event {
            merged.insert(key.clone(), value.clone());
        }
        Cow::Owned(merged)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current contents, for the debug surface
    pub fn snapshot(&self) -> ObjectMap {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    fn write(&mut self, key: &str, value: Value, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(previous) = self.entries.insert(
            key.to_string(),
            ContextEntry {
                value,
                updated_at: now,
                seq,
            },
        ) {
            self.order.remove(&previous.seq);
        }
        self.order.insert(seq, key.to_string());
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    fn evict_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.updated_at) > ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn enforce_bound(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.max_entries {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            evicted += 1;
        }
        evicted
    }
}
