//! # Bootstrap
//!
//! Transport library bootstrap.
//!
//! Responsibilities:
//! - Build the library source URLs (server-side container first, CDN fallback)
//! - Load the library with at most one fallback attempt
//! - Issue the one-time `js` / `config` commands
//! - Provide a simulated loader for runs without a browser

pub mod error;
pub mod loader;
pub mod mock_loader;
pub mod urls;

pub use error::{BootstrapError, Result};
pub use loader::{Bootstrap, LoadOutcome, ScriptLoader};
pub use mock_loader::SimulatedScriptLoader;
pub use urls::{ScriptSources, CDN_ORIGIN, LIBRARY_PATH};
