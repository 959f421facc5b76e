//! Shaped payloads and queued dispatch items

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized top-level parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Param {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Param::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

/// Transport-ready parameters of one event
///
/// Holds recognized top-level params and, when any other field survived
/// filtering, the serialized bundle field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapedPayload {
    params: BTreeMap<String, Param>,
}

impl ShapedPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Param) -> Option<Param> {
        self.params.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An accepted event waiting for a flush
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchItem {
    /// Trimmed event name
    pub event_name: String,

    /// Shaped parameters
    pub payload: ShapedPayload,

    /// Transport attempts made so far
    pub attempts: u32,
}

impl DispatchItem {
    pub fn new(event_name: impl Into<String>, payload: ShapedPayload) -> Self {
        Self {
            event_name: event_name.into(),
            payload,
            attempts: 0,
        }
    }
}
