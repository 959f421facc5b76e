//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `Value` mirrors the loosely typed objects producers push onto the data layer
//! - `ShapedPayload` is what reaches the transport
//! - `RelayStats` are observational counters, never read by the pipeline

mod config;
mod error;
mod payload;
mod stats;
mod transport;
mod value;

pub use config::*;
pub use error::*;
pub use payload::*;
pub use stats::*;
pub use transport::{LocalTransport, Transport, TransportCommand, TransportOptions};
pub use value::{format_number, ObjectMap, Shared, Value};

/// Version marker exposed on the debug surface
pub const RELAY_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
