//! # Event Bus
//!
//! The shared, append-only data layer that page code pushes onto, and the
//! interception hook the relay installs on it.
//!
//! ## Usage Example
//!
//! ```ignore
//! use event_bus::{DataLayer, PushObserver};
//!
//! let data_layer = DataLayer::new("dataLayer");
//! data_layer.push_one(Value::object([("page.title", Value::from("Home"))]));
//!
//! // Existing entries are drained through the observer once
//! let report = data_layer.intercept(observer)?;
//! let len = data_layer.push_one(Value::object([("event", Value::from("pageView"))]));
//! ```

mod data_layer;
mod error;

pub use data_layer::{DataLayer, InterceptReport, PushObserver};
pub use error::{EventBusError, Result};
