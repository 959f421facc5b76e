//! Transport trait - outbound analytics interface
//!
//! Mirrors the queueing command function of the analytics library:
//! `("js", date)`, `("config", id, options)` and `("event", name, params)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContractError, ShapedPayload};

/// Options sent with the one-time `config` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Page views are relayed as regular events, never sent automatically
    pub send_page_view: bool,

    /// Server-side endpoint, trailing slashes removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_url: Option<String>,
}

/// A single call to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TransportCommand {
    /// Library start timestamp
    Js { at: DateTime<Utc> },

    /// One-time property configuration
    Config {
        id: String,
        options: TransportOptions,
    },

    /// Forwarded event
    Event { name: String, params: ShapedPayload },
}

impl TransportCommand {
    /// Command label as the library names it
    pub fn kind(&self) -> &'static str {
        match self {
            TransportCommand::Js { .. } => "js",
            TransportCommand::Config { .. } => "config",
            TransportCommand::Event { .. } => "event",
        }
    }
}

/// Outbound transport
///
/// All transport implementations must implement this trait.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Hand one command to the transport
    ///
    /// # Errors
    /// Returns the transport failure; callers decide whether to retry
    async fn send(&mut self, command: TransportCommand) -> Result<(), ContractError>;
}
