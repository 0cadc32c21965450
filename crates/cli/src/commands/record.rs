//! `record` and `replay` command implementation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{RecorderSettings, SpawnTrigger};
use tracing::{info, warn};

use cli::pipeline::{Recorder, RecorderConfig};

use crate::args::{ConnectionArgs, LidarArgs, RecordArgs, ReplayArgs, SpawnArgs};

/// Execute the `record` command
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    let settings = build_settings(args)?;

    info!(
        host = %settings.carla.host,
        port = settings.carla.port,
        channels = settings.lidar.channels,
        spawn_min = settings.spawn.frequency.min,
        spawn_max = settings.spawn.frequency.max,
        seed = ?settings.recording.seed,
        "Settings loaded"
    );

    if args.dry_run {
        info!("Dry run mode - settings are valid, exiting");
        print_settings_summary(&settings, &args.connection.dataset_path, &args.output_path);
        return Ok(());
    }

    let config = RecorderConfig::from_settings(
        &settings,
        &args.connection.dataset_path,
        &args.output_path,
    );
    record(config).await
}

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    let mut settings = RecorderSettings::default();
    apply_connection(&mut settings, &args.connection);
    config_loader::validate(&settings).context("Invalid replay settings")?;

    let config = RecorderConfig::from_settings(
        &settings,
        &args.connection.dataset_path,
        &args.output_path,
    )
    .replay_only();
    record(config).await
}

/// Settings file (or defaults) with command-line overrides applied, validated
pub fn build_settings(args: &RecordArgs) -> Result<RecorderSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading settings file");
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
        }
        None => RecorderSettings::default(),
    };

    apply_connection(&mut settings, &args.connection);
    apply_lidar(&mut settings, &args.lidar);
    apply_spawn(&mut settings, &args.spawn);
    if args.seed.is_some() {
        settings.recording.seed = args.seed;
    }

    config_loader::validate(&settings).context("Invalid recorder settings")?;
    Ok(settings)
}

fn apply_connection(settings: &mut RecorderSettings, args: &ConnectionArgs) {
    if let Some(host) = &args.host {
        info!(host = %host, "Overriding CARLA host from CLI");
        settings.carla.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding CARLA port from CLI");
        settings.carla.port = port;
    }
    if let Some(timeout) = args.timeout {
        settings.carla.timeout_secs = timeout;
    }
    if let Some(max_frames) = args.max_frames {
        settings.recording.max_frames = (max_frames > 0).then_some(max_frames);
    }
}

fn apply_lidar(settings: &mut RecorderSettings, args: &LidarArgs) {
    let lidar = &mut settings.lidar;
    if let Some(v) = args.channels {
        lidar.channels = v;
    }
    if let Some(v) = args.points_per_second {
        lidar.points_per_second = v;
    }
    if let Some(v) = args.rotation_frequency {
        lidar.rotation_frequency = v;
    }
    if let Some(v) = args.range {
        lidar.range = v;
    }
    if let Some(v) = args.upper_fov {
        lidar.upper_fov = v;
    }
    if let Some(v) = args.lower_fov {
        lidar.lower_fov = v;
    }
}

fn apply_spawn(settings: &mut RecorderSettings, args: &SpawnArgs) {
    let spawn = &mut settings.spawn;
    if let Some(v) = args.spawn_min {
        spawn.frequency.min = v;
    }
    if let Some(v) = args.spawn_max {
        spawn.frequency.max = v;
    }
    if let Some(v) = args.spawn_range_min {
        spawn.distance.min = v;
    }
    if let Some(v) = args.spawn_range_max {
        spawn.distance.max = v;
    }
    if let Some(v) = args.spawn_persist_min {
        spawn.persistence.min = v;
    }
    if let Some(v) = args.spawn_persist_max {
        spawn.persistence.max = v;
    }
    if let Some(v) = args.spawn_rotation_min {
        spawn.rotation.min = v;
    }
    if let Some(v) = args.spawn_rotation_max {
        spawn.rotation.max = v;
    }
    if let Some(frames) = args.spawn_interval {
        spawn.trigger = SpawnTrigger::Interval { frames };
    }
    if let Some(p) = args.spawn_probability {
        spawn.trigger = SpawnTrigger::Probability { p };
    }
    if let Some(allowed) = &args.allowed_objects {
        spawn.allowed_objects = Some(allowed.clone());
    }
}

async fn record(config: RecorderConfig) -> Result<()> {
    let mut client = new_client()?;
    let mut recorder = Recorder::new(config).context("Invalid spawn configuration")?;

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = Arc::clone(&stop);
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, finishing current frame...");
        signal_stop.store(true, Ordering::SeqCst);
    });

    info!("Starting recording...");
    let result = recorder.run(&mut client, stop).await;
    signal_task.abort();

    let stats = result.context("Recording failed")?;
    info!(
        frames = stats.frames,
        scans = stats.scans_saved,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Recording completed"
    );
    stats.print_summary();
    Ok(())
}

#[cfg(feature = "real-carla")]
fn new_client() -> Result<actor_factory::RealCarlaClient> {
    Ok(actor_factory::RealCarlaClient::new())
}

/// Recording needs a CARLA server; the mock simulator stays a test double
#[cfg(not(feature = "real-carla"))]
fn new_client() -> Result<actor_factory::MockCarlaClient> {
    anyhow::bail!(
        "phantom-lidar was built without the `real-carla` feature; \
         rebuild with `--features real-carla` to record against a CARLA server"
    )
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
}

/// Print settings summary for dry-run mode
fn print_settings_summary(settings: &RecorderSettings, dataset: &Path, output: &Path) {
    println!("\n=== Recorder Settings ===\n");
    println!("Paths:");
    println!("  Dataset: {}", dataset.display());
    println!("  Output:  {}", output.display());
    println!(
        "\nCARLA: {}:{} (timeout {}s)",
        settings.carla.host, settings.carla.port, settings.carla.timeout_secs
    );

    let lidar = &settings.lidar;
    println!("\nLiDAR:");
    println!("  Channels:          {}", lidar.channels);
    println!("  Points/second:     {}", lidar.points_per_second);
    println!("  Rotation (Hz):     {}", lidar.rotation_frequency);
    println!("  Range (m):         {}", lidar.range);
    println!("  FOV (deg):         {} / {}", lidar.upper_fov, lidar.lower_fov);

    let spawn = &settings.spawn;
    println!("\nPhantoms:");
    if spawn.is_enabled() {
        println!(
            "  Per batch:         {}-{}",
            spawn.frequency.min, spawn.frequency.max
        );
        println!(
            "  Distance (m):      {}-{}",
            spawn.distance.min, spawn.distance.max
        );
        println!(
            "  Persistence:       {}-{} frames",
            spawn.persistence.min, spawn.persistence.max
        );
        println!(
            "  Yaw (deg):         {}..{}",
            spawn.rotation.min, spawn.rotation.max
        );
        match spawn.trigger {
            SpawnTrigger::Interval { frames } => println!("  Trigger:           every {frames} frames"),
            SpawnTrigger::Probability { p } => println!("  Trigger:           p = {p} per frame"),
        }
        match &spawn.allowed_objects {
            Some(allowed) => println!("  Allowed:           {}", allowed.join(", ")),
            None => println!("  Allowed:           full catalog"),
        }
    } else {
        println!("  Disabled");
    }

    let recording = &settings.recording;
    println!("\nRecording:");
    match recording.max_frames {
        Some(max) => println!("  Max frames:        {max}"),
        None => println!("  Max frames:        all"),
    }
    match recording.seed {
        Some(seed) => println!("  Seed:              {seed}"),
        None => println!("  Seed:              random"),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Cli, Commands};
    use clap::Parser;

    fn record_args(argv: &[&str]) -> RecordArgs {
        let mut full = vec!["phantom-lidar", "record"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Record(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_defaults() {
        let settings = build_settings(&record_args(&[])).unwrap();
        assert_eq!(settings.carla.host, "127.0.0.1");
        assert_eq!(settings.carla.port, 2000);
        assert_eq!(settings.lidar.channels, 64);
        assert_eq!(settings.spawn.frequency.min, 5);
        assert_eq!(settings.spawn.frequency.max, 10);
        assert_eq!(settings.recording.max_frames, None);
    }

    #[test]
    fn test_overrides() {
        let settings = build_settings(&record_args(&[
            "--port",
            "2010",
            "--channels",
            "32",
            "--spawn-min",
            "5",
            "--spawn-max",
            "5",
            "--spawn-probability",
            "0.25",
            "--max-frames",
            "0",
            "--seed",
            "11",
        ]))
        .unwrap();
        assert_eq!(settings.carla.port, 2010);
        assert_eq!(settings.lidar.channels, 32);
        assert_eq!(settings.spawn.frequency.min, 5);
        assert_eq!(settings.spawn.frequency.max, 5);
        assert_eq!(settings.spawn.trigger, SpawnTrigger::Probability { p: 0.25 });
        assert_eq!(settings.recording.max_frames, None);
        assert_eq!(settings.recording.seed, Some(11));
    }

    #[test]
    fn test_invalid_range_rejected() {
        let result = build_settings(&record_args(&["--spawn-min", "8", "--spawn-max", "3"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_blueprint_rejected() {
        let result = build_settings(&record_args(&["--allowed-objects", "vehicle.does.not_exist"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(
            &path,
            r#"{"carla": {"host": "sim.local", "port": 3000}, "recording": {"seed": 1}}"#,
        )
        .unwrap();

        let settings = build_settings(&record_args(&[
            "--config",
            path.to_str().unwrap(),
            "--port",
            "4000",
        ]))
        .unwrap();
        assert_eq!(settings.carla.host, "sim.local");
        assert_eq!(settings.carla.port, 4000);
        assert_eq!(settings.recording.seed, Some(1));
    }

    #[cfg(not(feature = "real-carla"))]
    #[tokio::test]
    async fn test_replay_without_real_client_fails_before_writing() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let output_path = out.path().join("replayed");
        let cli = Cli::try_parse_from([
            "phantom-lidar",
            "replay",
            "--dataset-path",
            data.path().to_str().unwrap(),
            "--output-path",
            output_path.to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };

        let err = run_replay(&args).await.unwrap_err();
        assert!(err.to_string().contains("real-carla"));
        assert!(!output_path.exists());
    }
}
