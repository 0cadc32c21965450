//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use dataset::DatasetSize;
use pointcloud::{ColorBy, Colormap};

/// Phantom LiDAR - CARLA phantom-object LiDAR recorder
#[derive(Parser, Debug)]
#[command(
    name = "phantom-lidar",
    author,
    version,
    about = "Record CARLA LiDAR scans with phantom objects around the ego vehicle",
    long_about = "Replays Bench2Drive scenarios in CARLA, spawns short-lived phantom \n\
                  objects near the ego vehicle and records LiDAR sweeps together with \n\
                  the augmented annotations. Also downloads the dataset and converts \n\
                  recorded LAZ scans to OBJ."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PHANTOM_LIDAR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PHANTOM_LIDAR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(
        long,
        default_value = "0",
        global = true,
        env = "PHANTOM_LIDAR_METRICS_PORT"
    )]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, validate and extract the Bench2Drive dataset
    Download(DownloadArgs),

    /// Replay dataset scenarios, spawn phantoms and record LiDAR
    Record(RecordArgs),

    /// Replay dataset scenarios without recording or phantoms
    Replay(ReplayArgs),

    /// Convert LAZ/LAS scans to an OBJ point cloud
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Dataset size
    #[arg(long, default_value = "mini", env = "PHANTOM_LIDAR_DATASET_SIZE")]
    pub size: DatasetSize,

    /// Base directory; files land in `<dir>-<size>`
    #[arg(long, default_value = "data/Bench2Drive", env = "PHANTOM_LIDAR_DATASET_DIR")]
    pub dir: PathBuf,

    /// Hide the progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// CARLA server connection flags
///
/// Unset flags fall back to the settings file, then to built-in defaults.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Dataset root: one instance, or a directory of instances
    #[arg(long, default_value = "data/Bench2Drive-mini", env = "PHANTOM_LIDAR_DATASET_PATH")]
    pub dataset_path: PathBuf,

    /// CARLA server host
    #[arg(long, env = "CARLA_HOST")]
    pub host: Option<String>,

    /// CARLA server port
    #[arg(long, env = "CARLA_PORT")]
    pub port: Option<u16>,

    /// Client timeout in seconds
    #[arg(long, env = "PHANTOM_LIDAR_TIMEOUT")]
    pub timeout: Option<f64>,

    /// Stop after this many frames in total (0 = all frames)
    #[arg(long, env = "PHANTOM_LIDAR_MAX_FRAMES")]
    pub max_frames: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Where per-instance `lidar/`, `anno_original/` and `anno_new/` are written
    #[arg(long, default_value = "data/recorded-lidar", env = "PHANTOM_LIDAR_OUTPUT_PATH")]
    pub output_path: PathBuf,

    /// Settings file (TOML or JSON); flags given here override it
    #[arg(short, long, env = "PHANTOM_LIDAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Validate the settings and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Seed for the phantom spawner (entropy when unset)
    #[arg(long, env = "PHANTOM_LIDAR_SEED")]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub lidar: LidarArgs,

    #[command(flatten)]
    pub spawn: SpawnArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LidarArgs {
    /// Number of laser channels
    #[arg(long)]
    pub channels: Option<u32>,

    #[arg(long)]
    pub points_per_second: Option<u32>,

    /// Rotation frequency (Hz)
    #[arg(long)]
    pub rotation_frequency: Option<u32>,

    /// Maximum range (metres)
    #[arg(long)]
    pub range: Option<f64>,

    /// Upper field of view (degrees)
    #[arg(long, allow_negative_numbers = true)]
    pub upper_fov: Option<f64>,

    /// Lower field of view (degrees)
    #[arg(long, allow_negative_numbers = true)]
    pub lower_fov: Option<f64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SpawnArgs {
    /// Minimum objects per spawn batch
    #[arg(long)]
    pub spawn_min: Option<u32>,

    /// Maximum objects per spawn batch (0 disables spawning)
    #[arg(long)]
    pub spawn_max: Option<u32>,

    /// Minimum distance from the ego vehicle (metres)
    #[arg(long)]
    pub spawn_range_min: Option<f64>,

    #[arg(long)]
    pub spawn_range_max: Option<f64>,

    /// Minimum frames a phantom stays alive
    #[arg(long)]
    pub spawn_persist_min: Option<u32>,

    #[arg(long)]
    pub spawn_persist_max: Option<u32>,

    /// Minimum phantom yaw (degrees)
    #[arg(long, allow_negative_numbers = true)]
    pub spawn_rotation_min: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub spawn_rotation_max: Option<f64>,

    /// Start a batch every N frames
    #[arg(long, conflicts_with = "spawn_probability")]
    pub spawn_interval: Option<u64>,

    /// Start a batch on each frame with this probability
    #[arg(long)]
    pub spawn_probability: Option<f64>,

    /// Blueprint ids phantoms are drawn from (default: full catalog)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub allowed_objects: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Where the replayed annotations are written
    #[arg(long, default_value = "data/replayed", env = "PHANTOM_LIDAR_REPLAY_OUTPUT")]
    pub output_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// A `.laz`/`.las` file or a directory of `.laz` scans
    pub input: PathBuf,

    /// Output OBJ path
    #[arg(short, long, default_value = "output.obj")]
    pub output: PathBuf,

    /// Scalar that drives vertex colours
    #[arg(long, default_value = "height")]
    pub color_by: ColorBy,

    #[arg(long, default_value = "rainbow")]
    pub colormap: Colormap,

    /// Keep at most this many points per file
    #[arg(long)]
    pub subsample: Option<usize>,

    /// Combine every file of a directory, offset along z
    #[arg(long)]
    pub stack: bool,

    /// Vertical offset between stacked files (metres)
    #[arg(long, default_value = "10.0")]
    pub spacing: f64,

    /// Use at most this many files of a directory
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Seed for subsampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
