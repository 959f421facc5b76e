//! `info` command implementation.

use anyhow::{Context, Result};
use bootstrap::ScriptSources;
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: &'static str,
    measurement_id: String,
    relay_queue_name: String,
    library: ScriptSources,
    filters: FilterInfo,
    params: ParamInfo,
    context: ContextInfo,
    retry_capacity: usize,
}

#[derive(Serialize)]
struct FilterInfo {
    blocked_event_prefixes: Vec<String>,
    allowlist_enabled: bool,
    allowed_event_prefixes: Vec<String>,
}

#[derive(Serialize)]
struct ParamInfo {
    discriminator: String,
    bundle_field: String,
    denylist: Vec<String>,
    deny_prefixes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recognized: Vec<String>,
}

#[derive(Serialize)]
struct ContextInfo {
    sticky_prefixes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sticky_fields: Vec<String>,
    max_entries: usize,
    ttl_secs: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info, config.params.recognized.len());
    }

    Ok(())
}

fn build_config_info(config: &RelayConfig, args: &InfoArgs) -> ConfigInfo {
    ConfigInfo {
        version: relay::RELAY_VERSION,
        measurement_id: config.measurement_id.clone(),
        relay_queue_name: config.relay_queue_name.clone(),
        library: ScriptSources::from_config(config),
        filters: FilterInfo {
            blocked_event_prefixes: config.filters.blocked_event_prefixes.clone(),
            allowlist_enabled: config.filters.allowlist_enabled,
            allowed_event_prefixes: config.filters.allowed_event_prefixes.clone(),
        },
        params: ParamInfo {
            discriminator: config.params.discriminator.clone(),
            bundle_field: config.params.bundle_field.clone(),
            denylist: config.params.denylist.clone(),
            deny_prefixes: config.params.deny_prefixes.clone(),
            recognized: if args.params {
                config.params.recognized.clone()
            } else {
                Vec::new()
            },
        },
        context: ContextInfo {
            sticky_prefixes: config.context.sticky_prefixes.clone(),
            sticky_fields: config.context.sticky_fields.clone(),
            max_entries: config.context.max_entries,
            ttl_secs: config.context.ttl_secs,
        },
        retry_capacity: config.dispatch.retry_capacity,
    }
}

fn print_config_info(info: &ConfigInfo, recognized_total: usize) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                DataLayer Relay Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Relay");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Measurement ID: {}", info.measurement_id);
    println!("   ├─ Command queue: {}", info.relay_queue_name);
    println!("   ├─ Library: {}", info.library.primary);
    match &info.library.fallback {
        Some(fallback) => println!("   └─ Fallback: {}", fallback),
        None => println!("   └─ Fallback: (none)"),
    }

    let filters = &info.filters;
    println!("\n🚦 Filters");
    println!("   ├─ Blocked prefixes: {:?}", filters.blocked_event_prefixes);
    if filters.allowlist_enabled {
        println!("   └─ Allowed prefixes: {:?}", filters.allowed_event_prefixes);
    } else {
        println!("   └─ Allowlist: disabled");
    }

    let params = &info.params;
    println!("\n🧩 Params");
    println!("   ├─ Discriminator: {}", params.discriminator);
    println!("   ├─ Bundle field: {}", params.bundle_field);
    println!("   ├─ Denylist: {:?}", params.denylist);
    println!("   ├─ Deny prefixes: {:?}", params.deny_prefixes);
    if params.recognized.is_empty() {
        println!("   └─ Recognized: {} names", recognized_total);
    } else {
        println!("   └─ Recognized ({}):", params.recognized.len());
        for (i, name) in params.recognized.iter().enumerate() {
            let prefix = if i == params.recognized.len() - 1 { "└─" } else { "├─" };
            println!("      {} {}", prefix, name);
        }
    }

    let context = &info.context;
    println!("\n📌 Context");
    println!("   ├─ Sticky prefixes: {:?}", context.sticky_prefixes);
    if !context.sticky_fields.is_empty() {
        println!("   ├─ Sticky fields: {:?}", context.sticky_fields);
    }
    println!("   ├─ Max entries: {}", context.max_entries);
    println!("   └─ TTL: {}s", context.ttl_secs);

    println!("\n📤 Dispatch");
    println!("   └─ Retry capacity: {}", info.retry_capacity);

    println!();
}
