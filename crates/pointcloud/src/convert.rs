//! LAZ to OBJ conversion

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::cloud::{Bounds, PointCloud};
use crate::colormap::{file_color, ColorBy, Colormap, Rgb};
use crate::error::{ConvertError, Result};
use crate::las_io::{is_point_cloud_file, read_cloud};
use crate::obj::write_obj;

/// Conversion settings
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub color_by: ColorBy,
    pub colormap: Colormap,
    /// Upper bound on points kept per file
    pub subsample: Option<usize>,
    /// Combine every file of a directory instead of only the first
    pub stack: bool,
    /// Vertical offset between stacked files (metres)
    pub spacing: f64,
    pub max_files: Option<usize>,
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            color_by: ColorBy::Height,
            colormap: Colormap::Rainbow,
            subsample: None,
            stack: false,
            spacing: 10.0,
            max_files: None,
            seed: None,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub files: usize,
    pub points: usize,
    pub bounds: Bounds,
    pub colored: bool,
}

/// Input files in processing order
pub fn collect_inputs(input: &Path, options: &ConvertOptions) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        if !is_point_cloud_file(input) {
            return Err(ConvertError::UnsupportedInput(input.to_path_buf()));
        }
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(ConvertError::NotFound(input.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(input)
        .map_err(ConvertError::io(input))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("laz"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ConvertError::NoFiles(input.to_path_buf()));
    }
    if let Some(max) = options.max_files {
        files.truncate(max.max(1));
    }
    if !options.stack {
        files.truncate(1);
    }
    Ok(files)
}

/// Convert a LAZ file, or a directory of them, into one OBJ
///
/// The OBJ goes to a temporary file beside `output` and only replaces it
/// once everything was read and written.
#[instrument(name = "pointcloud_convert", skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn convert(input: &Path, output: &Path, options: &ConvertOptions) -> Result<ConversionSummary> {
    let files = collect_inputs(input, options)?;
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed.unwrap_or_else(rand::random));

    let bar = progress_bar(options.show_progress && files.len() > 1, files.len() as u64);
    let mut positions = Vec::new();
    let mut colors: Option<Vec<Rgb>> = Some(Vec::new());
    let mut bounds = Bounds::new();

    for (index, path) in files.iter().enumerate() {
        bar.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let mut cloud = read_cloud(path)?;
        if let Some(limit) = options.subsample {
            cloud = subsample(cloud, limit, &mut rng);
        }
        cloud.offset_z(index as f64 * options.spacing);

        let file_colors = colorize(&cloud, options, index, files.len());
        match (&mut colors, file_colors) {
            (Some(all), Some(c)) => all.extend(c),
            (Some(_), None) => {
                if !matches!(options.color_by, ColorBy::None | ColorBy::File) {
                    warn!(file = %path.display(), "no colour source, writing uncoloured vertices");
                }
                colors = None;
            }
            (None, _) => {}
        }

        bounds.merge(&cloud.bounds());
        positions.extend(cloud.positions);
        bar.inc(1);
    }
    bar.finish_and_clear();

    write_atomically(output, &positions, colors.as_deref())?;

    let summary = ConversionSummary {
        files: files.len(),
        points: positions.len(),
        bounds,
        colored: colors.is_some(),
    };
    info!(
        files = summary.files,
        points = summary.points,
        colored = summary.colored,
        "conversion complete"
    );
    Ok(summary)
}

/// At most `limit` points, drawn without replacement
pub fn subsample(cloud: PointCloud, limit: usize, rng: &mut ChaCha8Rng) -> PointCloud {
    if cloud.len() <= limit {
        return cloud;
    }
    let indices = rand::seq::index::sample(rng, cloud.len(), limit).into_vec();
    cloud.select(&indices)
}

fn colorize(
    cloud: &PointCloud,
    options: &ConvertOptions,
    index: usize,
    count: usize,
) -> Option<Vec<Rgb>> {
    match options.color_by {
        ColorBy::Height => Some(options.colormap.apply(&cloud.heights())),
        ColorBy::Intensity => cloud
            .intensity
            .as_ref()
            .map(|values| options.colormap.apply(values)),
        // one file has nothing to tell apart
        ColorBy::File if count < 2 => None,
        ColorBy::File => Some(vec![file_color(index, count); cloud.len()]),
        ColorBy::None => None,
    }
}

fn write_atomically(output: &Path, positions: &[[f64; 3]], colors: Option<&[Rgb]>) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(ConvertError::io(dir))?;
    write_obj(BufWriter::new(&mut tmp), positions, colors).map_err(ConvertError::io(tmp.path()))?;
    tmp.persist(output)
        .map_err(|e| ConvertError::io(output)(e.error))?;
    Ok(())
}

fn progress_bar(visible: bool, len: u64) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}
