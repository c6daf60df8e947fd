//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::RoverBlueprint;
use lane_rover::{CliError, Pipeline, PipelineConfig};
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    apply_overrides(&mut blueprint, args);
    config_loader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        source = ?blueprint.camera.source,
        width = blueprint.camera.width,
        height = blueprint.camera.height,
        fps = blueprint.schedule.target_fps,
        sensor = %blueprint.sensor.bind,
        actuator = %blueprint.actuator.peer,
        operator = %blueprint.operator.bind,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics(args.metrics_port)?;
    }

    let config = PipelineConfig {
        blueprint,
        max_ticks: (args.max_ticks > 0).then_some(args.max_ticks),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        autostart: args.autostart,
    };

    let pipeline = Pipeline::start(config)
        .await
        .context("Failed to start pipeline")?;

    info!("Starting control loop...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Control loop failed")?;

    info!(
        ticks = stats.ticks,
        duration_secs = stats.duration.as_secs_f64(),
        tick_rate = format!("{:.2}", stats.tick_rate()),
        "Control loop finished"
    );
    stats.print_summary();

    info!("Lane Rover finished");
    Ok(())
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(blueprint: &mut RoverBlueprint, args: &RunArgs) {
    if let Some(source) = args.source {
        info!(source = ?source, "Overriding camera source from CLI");
        blueprint.camera.source = source.into();
    }
    if let Some(ref path) = args.source_path {
        blueprint.camera.path = Some(path.clone());
    }
    if let Some(fps) = args.fps {
        info!(fps, "Overriding control frequency from CLI");
        blueprint.schedule.target_fps = fps;
    }
    if let Some(ref bind) = args.sensor_bind {
        blueprint.sensor.bind = bind.clone();
    }
    if let Some(ref peer) = args.actuator {
        blueprint.actuator.peer = peer.clone();
    }
    if let Some(ref bind) = args.operator_bind {
        blueprint.operator.bind = bind.clone();
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping control loop...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RoverBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Camera:");
    println!("  Source: {:?}", blueprint.camera.source);
    if let Some(ref path) = blueprint.camera.path {
        println!("  Path: {}", path.display());
    }
    println!(
        "  Frame: {}x{}",
        blueprint.camera.width, blueprint.camera.height
    );
    println!("\nLoop:");
    println!("  Target: {} Hz", blueprint.schedule.target_fps);
    println!(
        "  Images every {} ticks (JPEG q{})",
        blueprint.schedule.image_every_ticks, blueprint.schedule.jpeg_quality
    );
    println!("\nLinks:");
    println!("  Sensor (udp): {}", blueprint.sensor.bind);
    println!("  Actuator (udp): {}", blueprint.actuator.peer);
    println!("  Operator (tcp): {}", blueprint.operator.bind);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use contracts::CameraSourceType;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["lane-rover", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_overrides_applied() {
        let args = run_args(&[
            "--source",
            "snapshot",
            "--source-path",
            "/dev/shm/cam.jpg",
            "--actuator",
            "10.0.0.2:50001",
            "--fps",
            "20",
        ]);
        let mut blueprint = RoverBlueprint::default();
        apply_overrides(&mut blueprint, &args);

        assert_eq!(blueprint.camera.source, CameraSourceType::Snapshot);
        assert_eq!(
            blueprint.camera.path.as_deref(),
            Some(std::path::Path::new("/dev/shm/cam.jpg"))
        );
        assert_eq!(blueprint.actuator.peer, "10.0.0.2:50001");
        assert_eq!(blueprint.schedule.target_fps, 20.0);
        assert_eq!(blueprint.sensor.bind, "0.0.0.0:50002");
    }

    #[test]
    fn test_invalid_override_caught_by_validation() {
        let args = run_args(&["--fps", "0"]);
        let mut blueprint = RoverBlueprint::default();
        apply_overrides(&mut blueprint, &args);
        assert!(config_loader::validate(&blueprint).is_err());
    }
}
