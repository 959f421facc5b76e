//! Script loading abstraction and the library bootstrap sequence

use std::future::Future;

use chrono::Utc;
use contracts::{RelayConfig, Transport, TransportCommand, TransportOptions};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{BootstrapError, Result};
use crate::urls::ScriptSources;

/// Script loader trait
///
/// Abstracts fetching and evaluating the transport library so the
/// bootstrap sequence can run against a simulated loader.
pub trait ScriptLoader: Send + Sync {
    /// Load the script at `url`
    fn load(&self, url: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Where the library ended up being loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Primary,
    Fallback,
    /// Both sources failed, or the only source failed
    Failed,
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, LoadOutcome::Failed)
    }
}

/// Library bootstrap
///
/// 负责加载传输库并发出一次性的 `js` / `config` 命令。
#[derive(Debug, Clone)]
pub struct Bootstrap {
    measurement_id: String,
    transport_url: Option<String>,
    sources: ScriptSources,
}

impl Bootstrap {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            measurement_id: config.measurement_id.clone(),
            transport_url: config.normalized_transport_url(),
            sources: ScriptSources::from_config(config),
        }
    }

    pub fn sources(&self) -> &ScriptSources {
        &self.sources
    }

    /// Load the library, falling back at most once
    ///
    /// A failed fallback is terminal and never retried.
    #[instrument(name = "bootstrap_load_library", skip(self, loader))]
    pub async fn load_library<L: ScriptLoader>(&self, loader: &L) -> LoadOutcome {
        let primary_error = match loader.load(&self.sources.primary).await {
            Ok(()) => {
                info!(url = %self.sources.primary, "Transport library loaded");
                return LoadOutcome::Primary;
            }
            Err(e) => e,
        };

        let Some(fallback) = &self.sources.fallback else {
            debug!(url = %self.sources.primary, error = %primary_error, "Transport library failed to load");
            return LoadOutcome::Failed;
        };

        warn!(
            url = %self.sources.primary,
            fallback = %fallback,
            error = %primary_error,
            "Primary library source failed, trying fallback"
        );

        match loader.load(fallback).await {
            Ok(()) => {
                info!(url = %fallback, "Transport library loaded from fallback");
                LoadOutcome::Fallback
            }
            Err(e) => {
                debug!(url = %fallback, error = %e, "Fallback library source failed");
                LoadOutcome::Failed
            }
        }
    }

    /// The one-time `config` command
    pub fn config_command(&self) -> TransportCommand {
        TransportCommand::Config {
            id: self.measurement_id.clone(),
            options: TransportOptions {
                send_page_view: false,
                transport_url: self.transport_url.clone(),
            },
        }
    }

    /// Issue `js` then `config` on the transport
    #[instrument(name = "bootstrap_configure", skip(self, transport), fields(transport = transport.name()))]
    pub async fn configure<T: Transport>(&self, transport: &mut T) -> Result<()> {
        let commands = [TransportCommand::Js { at: Utc::now() }, self.config_command()];
        for command in commands {
            let kind = command.kind();
            transport
                .send(command)
                .await
                .map_err(|source| BootstrapError::CommandFailed { command: kind, source })?;
        }
        debug!(measurement_id = %self.measurement_id, "Transport configured");
        Ok(())
    }
}
