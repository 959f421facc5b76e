//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    measurement_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport_url: Option<String>,
    allowlist_enabled: bool,
    allowed_prefix_count: usize,
    recognized_param_count: usize,
    sticky_prefix_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    measurement_id: config.measurement_id.clone(),
                    transport_url: config.normalized_transport_url(),
                    allowlist_enabled: config.filters.allowlist_enabled,
                    allowed_prefix_count: config.filters.allowed_event_prefixes.len(),
                    recognized_param_count: config.params.recognized.len(),
                    sticky_prefix_count: config.context.sticky_prefixes.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.filters.allowlist_enabled && config.filters.allowed_event_prefixes.is_empty() {
        warnings.push(
            "filters.allowlist_enabled with no allowed prefixes - every event will be rejected"
                .to_string(),
        );
    }

    if config.transport_url.is_some() && !config.load_from_server {
        warnings.push(
            "transport_url is set but load_from_server is false - library loads from the CDN"
                .to_string(),
        );
    }

    if config.params.recognized.is_empty() {
        warnings.push("params.recognized is empty - every field goes to the bundle".to_string());
    }

    if config.debug {
        warnings.push("debug logging is enabled".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Measurement ID: {}", summary.measurement_id);
            if let Some(ref url) = summary.transport_url {
                println!("  Transport URL: {}", url);
            }
            println!(
                "  Allowlist: {} ({} prefixes)",
                if summary.allowlist_enabled { "on" } else { "off" },
                summary.allowed_prefix_count
            );
            println!("  Recognized params: {}", summary.recognized_param_count);
            println!("  Sticky prefixes: {}", summary.sticky_prefix_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
