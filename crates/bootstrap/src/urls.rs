//! Transport library source URLs

use contracts::RelayConfig;
use serde::Serialize;

/// Public CDN origin of the transport library
pub const CDN_ORIGIN: &str = "https://www.googletagmanager.com";

/// Library path, relative to either origin
pub const LIBRARY_PATH: &str = "/gtag/js";

/// Where the transport library is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSources {
    /// Tried first
    pub primary: String,
    /// Tried at most once, only after the primary failed
    pub fallback: Option<String>,
}

impl ScriptSources {
    /// Server-side container first when configured, CDN otherwise
    pub fn from_config(config: &RelayConfig) -> Self {
        let query = format!(
            "id={}&l={}",
            urlencoding::encode(&config.measurement_id),
            urlencoding::encode(&config.relay_queue_name)
        );
        let cdn = format!("{CDN_ORIGIN}{LIBRARY_PATH}?{query}");

        match config.normalized_transport_url() {
            Some(base) if config.load_from_server => Self {
                primary: format!("{base}{LIBRARY_PATH}?{query}"),
                fallback: Some(cdn),
            },
            _ => Self {
                primary: cdn,
                fallback: None,
            },
        }
    }
}
