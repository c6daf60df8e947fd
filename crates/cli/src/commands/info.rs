//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RoverBlueprint;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = ?args.config, "Loading configuration info");

    let blueprint = load_blueprint(args.config.as_deref())?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&blueprint)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn print_config_info(blueprint: &RoverBlueprint, args: &InfoArgs) {
    let camera = &blueprint.camera;
    println!("=== Lane Rover Configuration ===\n");
    println!("Version: {:?}", blueprint.version);

    println!("\nCamera:");
    println!("  Source: {:?}", camera.source);
    match camera.path {
        Some(ref path) => println!("  Path: {}", path.display()),
        None => println!("  Path: (none)"),
    }
    println!("  Frame: {}x{}", camera.width, camera.height);
    println!("  Retry interval: {} ms", camera.retry_interval_ms);

    let schedule = &blueprint.schedule;
    println!("\nLoop:");
    println!(
        "  Target: {} Hz ({:.1} ms)",
        schedule.target_fps,
        schedule.period().as_secs_f64() * 1000.0
    );
    println!("  Images every {} ticks", schedule.image_every_ticks);

    println!("\nLinks:");
    println!(
        "  Sensor: udp {} (range {} cm, stale after {} ms)",
        blueprint.sensor.bind, blueprint.sensor.detection_range_cm, blueprint.sensor.stale_after_ms
    );
    println!("  Actuator: udp {}", blueprint.actuator.peer);
    println!(
        "  Operator: tcp {} (queue {}, log sink {})",
        blueprint.operator.bind, blueprint.operator.queue_capacity, blueprint.operator.log_sink
    );

    if args.vision {
        let v = &blueprint.vision;
        println!("\nVision:");
        println!("  HLS range: {:?} .. {:?}", v.hls_lower, v.hls_upper);
        println!("  Canny: {} / {}", v.canny_low, v.canny_high);
        println!(
            "  Hough: threshold {}, min length {}, max gap {}",
            v.hough_threshold, v.min_line_length, v.max_line_gap
        );
        println!(
            "  Position: band {:.2}, tolerance {:.2}",
            v.position_band, v.position_tolerance
        );
        println!(
            "  Obstacle cue: roi {:.2}, min area {}",
            v.obstacle_roi, v.obstacle_min_area
        );
    }

    if args.control {
        let c = &blueprint.control;
        println!("\nControl:");
        println!(
            "  PID: kp={} ki={} kd={} (integral limit {})",
            c.pid.kp, c.pid.ki, c.pid.kd, c.pid.integral_limit
        );
        println!(
            "  Speed tiers: >{}° → {}, >{}° → {}, else {}",
            c.speed.sharp_deg,
            c.speed.sharp_speed,
            c.speed.moderate_deg,
            c.speed.moderate_speed,
            c.speed.straight_speed
        );
        let a = &c.avoidance;
        println!(
            "  Avoidance: stop <{} cm, enter <{} cm, exit >{} cm",
            a.danger_cm, a.enter_cm, a.exit_cm
        );
    }
}
