//! `validate` command implementation.

use serde::Serialize;
use tracing::info;

use config_loader::{ConfigLoader, FanoutConfig};

use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};

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
    version: String,
    store_path: String,
    dirs_only: bool,
    concurrency: usize,
    deadline_secs: u64,
    queue_capacity: usize,
    admission: String,
    progress_every: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_validation(
            result.error.unwrap_or_else(|| "invalid configuration".to_string()),
        ))
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

    match ConfigLoader::load_from_path(&args.config) {
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
                summary: Some(summarize(&config)),
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

fn summarize(config: &FanoutConfig) -> ConfigSummary {
    let dispatch = &config.dispatch;
    ConfigSummary {
        version: format!("{:?}", config.version),
        store_path: config.store.path.display().to_string(),
        dirs_only: config.store.dirs_only,
        concurrency: dispatch.concurrency,
        deadline_secs: dispatch.deadline_secs,
        queue_capacity: dispatch.queue_capacity,
        admission: format!("{:?}", dispatch.admission).to_lowercase(),
        progress_every: dispatch.progress_every,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &FanoutConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let dispatch = &config.dispatch;

    if !config.store.path.is_dir() {
        warnings.push(format!(
            "store.path '{}' is not a directory - every broadcast will be empty",
            config.store.path.display()
        ));
    }

    if dispatch.queue_capacity != 0 && dispatch.queue_capacity < dispatch.concurrency {
        warnings.push(format!(
            "dispatch.queue_capacity {} is below concurrency {} - workers may idle",
            dispatch.queue_capacity, dispatch.concurrency
        ));
    }

    if dispatch.deadline_secs < 60 {
        warnings.push(format!(
            "dispatch.deadline_secs is {} - large stores may not finish",
            dispatch.deadline_secs
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Store: {}", summary.store_path);
            println!("  Concurrency: {}", summary.concurrency);
            println!("  Deadline: {}s", summary.deadline_secs);
            println!("  Admission: {}", summary.admission);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
