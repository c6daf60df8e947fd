//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CameraSourceType, RoverBlueprint};
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
    version: String,
    source: String,
    frame: String,
    target_fps: f64,
    sensor_bind: String,
    actuator_peer: String,
    operator_bind: String,
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
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    source: format!("{:?}", blueprint.camera.source),
                    frame: format!("{}x{}", blueprint.camera.width, blueprint.camera.height),
                    target_fps: blueprint.schedule.target_fps,
                    sensor_bind: blueprint.sensor.bind.clone(),
                    actuator_peer: blueprint.actuator.peer.clone(),
                    operator_bind: blueprint.operator.bind.clone(),
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
fn collect_warnings(blueprint: &RoverBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.camera.source == CameraSourceType::Synthetic {
        warnings.push("camera.source is synthetic - no real camera will be read".to_string());
    }

    if blueprint.schedule.target_fps > 60.0 {
        warnings.push(format!(
            "loop.target_fps = {} leaves under 17 ms per tick for vision",
            blueprint.schedule.target_fps
        ));
    }

    if blueprint.sensor.stale_after_ms == 0 {
        warnings.push(
            "sensor.stale_after_ms is 0 - a silent sensor keeps its last obstacle forever"
                .to_string(),
        );
    }

    if blueprint.control.pid.ki == 0.0 && blueprint.control.pid.kd == 0.0 {
        warnings.push("control.pid is proportional only".to_string());
    }

    if blueprint.schedule.image_every_ticks > 100 {
        warnings.push(format!(
            "loop.image_every_ticks = {} - operator images will be rare",
            blueprint.schedule.image_every_ticks
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Camera: {} {}", summary.source, summary.frame);
            println!("  Target: {} Hz", summary.target_fps);
            println!("  Sensor: {}", summary.sensor_bind);
            println!("  Actuator: {}", summary.actuator_peer);
            println!("  Operator: {}", summary.operator_bind);
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
