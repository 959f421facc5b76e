//! `run` command implementation.

use std::time::Instant;

use anyhow::{Context, Result};
use bootstrap::{Bootstrap, LoadOutcome, SimulatedScriptLoader};
use contracts::RelayConfig;
use dispatcher::{LogTransport, QueuedTransport};
use event_bus::DataLayer;
use relay::Relay;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::input::{read_values, ParsedInput};
use crate::summary::RunSummary;

type RelayTransport = QueuedTransport<LogTransport>;

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        measurement_id = %config.measurement_id,
        transport_url = ?config.normalized_transport_url(),
        allowlist_enabled = config.filters.allowlist_enabled,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let started = Instant::now();

    let preloaded = match &args.preloaded {
        Some(path) => read_values(path)?,
        None => ParsedInput::default(),
    };
    let data_layer = DataLayer::with_entries(&args.data_layer, preloaded.values);

    let (transport, library) = bootstrap_transport(&config, args.fail_primary).await?;
    let relay = Relay::install(config, transport, &data_layer)
        .context("Failed to install relay")?;

    let input = match &args.input {
        Some(path) => read_values(path)?,
        None => ParsedInput::default(),
    };
    let pushed = input.values.len();
    for value in input.values {
        data_layer.push_one(value);
    }

    info!(pushed, "Input pushed, waiting for dispatch queue");

    tokio::select! {
        _ = relay.settle() => {}
        _ = shutdown_signal() => {
            warn!(pending = relay.queue().pending_len(), "Received shutdown signal, stopping");
        }
    }

    let debug = relay.debug();
    let buffered_commands = relay.queue().lock_transport().await.buffered();

    let summary = RunSummary {
        library,
        intercept: relay.intercept_report(),
        pushed,
        skipped_lines: preloaded.skipped + input.skipped,
        stats: debug.stats,
        dispatch: relay.queue().metrics().snapshot(),
        batches: relay.queue().metrics().batch_summary(),
        buffered_commands,
        context_entries: debug.context_entries,
        duration: started.elapsed(),
    };

    info!(
        processed = summary.stats.processed,
        sent = summary.stats.sent,
        duration_secs = summary.duration.as_secs_f64(),
        "Relay run completed"
    );
    summary.print_summary();

    Ok(())
}

/// Queue `js`/`config`, then load the library and attach it
async fn bootstrap_transport(
    config: &RelayConfig,
    fail_primary: bool,
) -> Result<(RelayTransport, LoadOutcome)> {
    let mut transport = RelayTransport::new(
        config.relay_queue_name.clone(),
        config.dispatch.buffered_commands,
    );

    let bootstrap = Bootstrap::new(config);
    bootstrap
        .configure(&mut transport)
        .await
        .context("Failed to configure transport")?;

    let loader = if fail_primary {
        SimulatedScriptLoader::new().failing(bootstrap.sources().primary.clone())
    } else {
        SimulatedScriptLoader::new()
    };

    let library = bootstrap.load_library(&loader).await;
    if library.is_loaded() {
        transport.attach(LogTransport::new("library")).await;
    } else {
        warn!(
            buffered = transport.buffered(),
            "Transport library unavailable, commands stay buffered"
        );
    }

    Ok((transport, library))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
